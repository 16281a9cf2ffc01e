pub mod session;
pub mod wallet;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ripple-vault")]
#[command(about = "Offline password-protected store for XRP Ledger accounts", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "ripple-vault.toml")]
    pub config: PathBuf,

    /// Wallet file (overrides the config)
    #[arg(long)]
    pub wallet: Option<PathBuf>,

    /// Wallet password; prompted for when absent
    #[arg(long, env = "RIPPLE_VAULT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create a new wallet file protected by a password
    Init,
    /// List all accounts
    List,
    /// Generate a new sending account
    Generate {
        /// Display name; defaults to the start of the address
        #[arg(long)]
        name: Option<String>,
    },
    /// Add an existing account (with --secret to send from it)
    Add {
        /// Display name; defaults to the start of the address
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        address: String,
        #[arg(long)]
        secret: Option<String>,
        #[arg(long, default_value_t = 1)]
        sequence: u32,
    },
    /// Change an account's display name
    Rename {
        #[arg(long)]
        address: String,
        #[arg(long)]
        name: String,
    },
    /// Set an account's transaction sequence
    Sequence {
        #[arg(long)]
        address: String,
        #[arg(long)]
        value: u32,
    },
    /// Delete an account
    Delete {
        #[arg(long)]
        address: String,
    },
    /// Show one account
    Show {
        #[arg(long)]
        address: String,
        /// Print the secret key
        #[arg(long)]
        reveal: bool,
    },
}

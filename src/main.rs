use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter};

use ripple_vault::cli::{wallet, Cli};
use ripple_vault::config::VaultConfig;
use ripple_vault::storage::WalletFile;

fn main() {
    let cli = Cli::parse();

    // Logging is up before the config loads so its warnings reach stderr;
    // the configured level is applied once the config is known.
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_overrides = from_env.is_some();
    let (filter, filter_handle) = reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = VaultConfig::load_or_default(&cli.config);
    if !env_overrides {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.log_level)) {
            warn!("Could not apply log level '{}': {}", config.log_level, e);
        }
    }

    let path = match cli.wallet.clone().map(Ok).unwrap_or_else(|| config.wallet_path()) {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = wallet::handle_command(cli.command, &config, WalletFile::new(path), cli.password) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

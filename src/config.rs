use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::WalletError;

const WALLET_DIR: &str = ".XRPoffline";
const WALLET_FILE: &str = "ripple.dat";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct VaultConfig {
    #[serde(default)]
    pub wallet_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub reference_account: ReferenceAccount,
}

/// Built-in receive-only account shown in every wallet.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReferenceAccount {
    pub name: String,
    pub address: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ReferenceAccount {
    fn default() -> Self {
        Self {
            name: "~rippleOffline".to_string(),
            address: "rUsW2dU5NnAhg6f78soejmFFpfRvzefYfs".to_string(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            wallet_file: None,
            log_level: default_log_level(),
            reference_account: ReferenceAccount::default(),
        }
    }
}

impl VaultConfig {
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(c) => {
                    info!("Config loaded from {}", path.display());
                    c
                }
                Err(e) => {
                    warn!("{}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Config file not found at '{}'. Creating default.", path.display());
            let config = Self::default();
            if let Err(e) = config.write(path) {
                warn!("Could not write default config: {}", e);
            }
            config
        }
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| WalletError::Config(format!("reading {}: {}", path.display(), e)))?;
        toml::from_str(&s).map_err(|e| WalletError::Config(format!("parsing {}: {}", path.display(), e)))
    }

    pub fn write(&self, path: &Path) -> Result<(), WalletError> {
        let s = toml::to_string_pretty(self).map_err(|e| WalletError::Config(e.to_string()))?;
        std::fs::write(path, s)?;
        Ok(())
    }

    /// Configured wallet file, else `$HOME/.XRPoffline/ripple.dat`.
    pub fn wallet_path(&self) -> Result<PathBuf, WalletError> {
        if let Some(p) = &self.wallet_file {
            return Ok(p.clone());
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(WALLET_DIR).join(WALLET_FILE))
            .ok_or_else(|| WalletError::Config("cannot locate home directory".to_string()))
    }
}

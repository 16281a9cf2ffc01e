use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Malformed wallet document: {0}")]
    MalformedDocument(String),
    #[error("Unsupported wallet document version {0}")]
    UnsupportedVersion(u32),
    #[error("Missing salt in wallet file")]
    MissingSalt,
    #[error("Failed to set password & salt: {0}")]
    KeySetupFailed(String),
    #[error("Incorrect password.")]
    IncorrectPassword,
    #[error("Password must not be empty.")]
    EmptyPassword,
    #[error("Entered passwords do not match.")]
    PasswordConfirmation,
    #[error("Invalid address for account {account}")]
    InvalidAddress { account: String },
    #[error("Invalid sequence for account {account}")]
    InvalidSequence { account: String },
    #[error("Failed to decrypt secret for account {account}")]
    DecryptFailed { account: String },
    #[error("Password failed when loading account {account}")]
    PasswordMismatch { account: String },
    #[error("Account id {id} is already in the wallet")]
    DuplicateAccount { id: u64 },
    #[error("Can not save wallet, salt not set.")]
    NoSession,
    #[error("Failed to serialize wallet: {0}")]
    SerializeFailed(String),
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WalletError {
    /// Errors a host can recover from by asking for another password.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::IncorrectPassword
                | WalletError::KeySetupFailed(_)
                | WalletError::EmptyPassword
                | WalletError::PasswordConfirmation
        )
    }
}

pub type Result<T> = std::result::Result<T, WalletError>;

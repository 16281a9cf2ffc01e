use std::io::{self, Write};

use tracing::info;

use crate::account::WalletStore;
use crate::error::WalletError;
use crate::storage::WalletFile;

/// Prompted passwords get this many tries before the command gives up.
pub const MAX_PASSWORD_ATTEMPTS: usize = 3;

/// An unlocked wallet bound to its file. Every mutation is followed by
/// [`Session::save`].
pub struct Session {
    pub store: WalletStore,
    file: WalletFile,
}

impl Session {
    /// Initialize `store` under `password` and write it as a brand-new
    /// wallet file. Refuses to overwrite one.
    pub fn create(mut store: WalletStore, file: WalletFile, password: &str) -> Result<Self, WalletError> {
        if file.exists() {
            return Err(WalletError::InvalidInput(format!(
                "wallet file '{}' already exists",
                file.path().display()
            )));
        }

        store.initialize_new(password)?;
        let session = Session { store, file };
        session.save()?;
        info!("Created wallet at {}", session.file.path().display());
        Ok(session)
    }

    /// Read the wallet file and unlock it into `store`.
    pub fn open(mut store: WalletStore, file: WalletFile, password: &str) -> Result<Self, WalletError> {
        let contents = file.load()?.ok_or_else(|| {
            WalletError::InvalidInput(format!(
                "no wallet at '{}', run `init` first",
                file.path().display()
            ))
        })?;

        store.unlock(&contents, password)?;
        Ok(Session { store, file })
    }

    pub fn save(&self) -> Result<(), WalletError> {
        let document = self.store.save()?;
        self.file.store(&document)
    }
}

/// Run `attempt` with a password.
///
/// A password given on the command line or in the environment gets a single
/// try. Otherwise `ask` is called again after every retryable failure, up to
/// [`MAX_PASSWORD_ATTEMPTS`] times.
pub fn with_password<T>(
    given: Option<String>,
    mut ask: impl FnMut() -> Result<String, WalletError>,
    mut attempt: impl FnMut(&str) -> Result<T, WalletError>,
) -> Result<T, WalletError> {
    if let Some(password) = given {
        return attempt(&require_password(password)?);
    }

    let mut tries = 0;
    loop {
        tries += 1;
        match ask().and_then(|password| attempt(&password)) {
            Err(e) if e.is_retryable() && tries < MAX_PASSWORD_ATTEMPTS => println!("{} Try again.", e),
            result => return result,
        }
    }
}

fn require_password(password: String) -> Result<String, WalletError> {
    if password.is_empty() {
        return Err(WalletError::EmptyPassword);
    }
    Ok(password)
}

fn prompt(label: &str) -> Result<String, WalletError> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Prompt for the password of an existing wallet.
pub fn ask_password() -> Result<String, WalletError> {
    require_password(prompt("Enter wallet password: ")?)
}

/// Prompt for a new password and its confirmation.
pub fn ask_new_password() -> Result<String, WalletError> {
    let password = require_password(prompt("Enter new wallet password: ")?)?;
    confirm(password, prompt("Confirm new wallet password: ")?)
}

fn confirm(password: String, repeated: String) -> Result<String, WalletError> {
    if password != repeated {
        return Err(WalletError::PasswordConfirmation);
    }
    Ok(password)
}

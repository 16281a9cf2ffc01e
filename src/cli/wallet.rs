use tracing::info;

use super::session::{ask_new_password, ask_password, with_password, Session};
use super::Commands;
use crate::account::{AccountId, AccountRecord, WalletStore};
use crate::config::VaultConfig;
use crate::error::WalletError;
use crate::ledger::Ledger;
use crate::storage::WalletFile;

pub fn handle_command(
    cmd: Commands,
    config: &VaultConfig,
    file: WalletFile,
    password: Option<String>,
) -> Result<(), WalletError> {
    let fresh_store = || WalletStore::new(&config.reference_account);

    if let Commands::Init = cmd {
        with_password(password, ask_new_password, |pw| Session::create(fresh_store(), file.clone(), pw))?;
        println!("Wallet created. Secret keys are encrypted with your password.");
        println!("The wallet file is saved after each operation.");
        return Ok(());
    }

    let mut session = with_password(password, ask_password, |pw| Session::open(fresh_store(), file.clone(), pw))?;
    if apply(&cmd, &mut session.store)? {
        session.save()?;
    }
    Ok(())
}

/// Run one command against an unlocked store. Returns whether the store
/// changed and must be saved.
pub fn apply(cmd: &Commands, store: &mut WalletStore) -> Result<bool, WalletError> {
    match cmd {
        Commands::Init => Err(WalletError::InvalidInput("wallet already initialized".to_string())),
        Commands::List => {
            for acc in store.accounts() {
                println!("{}", describe(acc));
            }
            Ok(false)
        }
        Commands::Generate { name } => {
            let keypair = store.ledger().generate_keypair();
            let name = name.clone().unwrap_or_else(|| default_name(&keypair.address));
            require_name(&name)?;
            let record = store.new_account(name, keypair.address, keypair.secret, 1);
            let id = store.add_account(record)?;
            let acc = lookup(store, id)?;
            println!("Account '{}' created.", acc.name());
            println!("Address: {}", acc.address());
            println!("\n[SECRET KEY] - Write this down securely and NEVER share it:");
            println!("---------------------------------------------------------------");
            println!("{}", acc.secret_key());
            println!("---------------------------------------------------------------");
            Ok(true)
        }
        Commands::Add { name, address, secret, sequence } => {
            let name = name.clone().unwrap_or_else(|| default_name(address));
            require_name(&name)?;
            let secret = secret.clone().unwrap_or_default();
            let record = store.new_account(name, address.as_str(), secret, *sequence);
            check_acceptable(&record)?;
            let id = store.add_account(record)?;
            info!("Added account {}", address);
            println!("{}", describe(lookup(store, id)?));
            Ok(true)
        }
        Commands::Rename { address, name } => {
            require_name(name)?;
            let id = find(store, address)?;
            if let Some(acc) = store.get_account_mut(id) {
                acc.set_name(name.as_str());
            }
            Ok(true)
        }
        Commands::Sequence { address, value } => {
            let id = find(store, address)?;
            let acc = store
                .get_account_mut(id)
                .ok_or_else(|| no_account(address))?;
            if *value == 0 && !acc.is_watch_only() {
                return Err(WalletError::InvalidInput("sequence must be at least 1".to_string()));
            }
            acc.set_sequence(*value);
            Ok(true)
        }
        Commands::Delete { address } => {
            let id = find(store, address)?;
            let removed = store.delete_account(id).ok_or_else(|| no_account(address))?;
            println!("Deleted account '{}'.", removed.name());
            Ok(true)
        }
        Commands::Show { address, reveal } => {
            let acc = store.find_by_address(address).ok_or_else(|| no_account(address))?;
            println!("{}", describe(acc));
            if *reveal && !acc.is_watch_only() {
                println!("Secret: {}", acc.secret_key());
            }
            Ok(false)
        }
    }
}

/// Acceptance rules for manually added accounts: a sender needs a matching
/// secret, a recipient a valid address.
fn check_acceptable(record: &AccountRecord) -> Result<(), WalletError> {
    if !record.can_receive() {
        return Err(WalletError::InvalidInput(format!("invalid address {}", record.address())));
    }
    if !record.is_watch_only() && !record.can_send() {
        return Err(WalletError::InvalidInput(
            "secret key does not belong to this address".to_string(),
        ));
    }
    if !record.is_watch_only() && record.sequence() == 0 {
        return Err(WalletError::InvalidInput("sequence must be at least 1".to_string()));
    }
    Ok(())
}

fn require_name(name: &str) -> Result<(), WalletError> {
    if name.trim().is_empty() {
        return Err(WalletError::InvalidInput("account name must not be empty".to_string()));
    }
    Ok(())
}

/// Display name used when none is given: the start of the address.
fn default_name(address: &str) -> String {
    address.chars().take(5).collect()
}

fn no_account(address: &str) -> WalletError {
    WalletError::InvalidInput(format!("no account with address {}", address))
}

fn find(store: &WalletStore, address: &str) -> Result<AccountId, WalletError> {
    store
        .find_by_address(address)
        .map(AccountRecord::id)
        .ok_or_else(|| no_account(address))
}

fn lookup(store: &WalletStore, id: AccountId) -> Result<&AccountRecord, WalletError> {
    store
        .get_account(id)
        .ok_or_else(|| WalletError::InvalidInput(format!("no account with id {}", id)))
}

fn describe(acc: &AccountRecord) -> String {
    let mut caps = Vec::new();
    if acc.can_send() {
        caps.push("send");
    }
    if acc.can_receive() {
        caps.push("receive");
    }
    let sequence = if acc.is_watch_only() {
        "-".to_string()
    } else {
        acc.sequence().to_string()
    };
    format!(
        "{}\t{}\t{}\tseq {}\t[{}]",
        acc.id(),
        acc.name(),
        acc.address(),
        sequence,
        caps.join(",")
    )
}

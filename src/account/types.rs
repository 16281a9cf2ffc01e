//! Account record definitions

use std::sync::atomic::{AtomicU64, Ordering};

use zeroize::Zeroizing;

use crate::ledger::Ledger;

/// Session-scoped account identifier. Never persisted.
pub type AccountId = u64;

static NEXT_ACCOUNT_ID: AtomicU64 = AtomicU64::new(0);

fn next_account_id() -> AccountId {
    NEXT_ACCOUNT_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single account held by the wallet.
///
/// Cloning yields a new account with its own id.
#[derive(Debug, PartialEq, Eq)]
pub struct AccountRecord {
    id: AccountId,
    name: String,
    address: String,
    secret_key: Zeroizing<String>, // empty for watch-only accounts
    sequence: u32,
    can_send: bool,    // valid address & key pair
    can_receive: bool, // valid address
    is_sentinel: bool,
}

impl AccountRecord {
    /// Build a record and compute its capabilities.
    ///
    /// An invalid address or a secret that does not control `address` is not
    /// an error; it only clears the corresponding flag.
    pub fn new(
        ledger: &impl Ledger,
        name: impl Into<String>,
        address: impl Into<String>,
        secret_key: impl Into<String>,
        sequence: u32,
    ) -> Self {
        let address = address.into();
        let secret_key = secret_key.into();

        let can_receive = ledger.validate_address(&address);
        let can_send = !secret_key.is_empty()
            && ledger.address_from_secret(&secret_key).as_deref() == Some(address.as_str());

        AccountRecord {
            id: next_account_id(),
            name: name.into(),
            address,
            secret_key: Zeroizing::new(secret_key),
            sequence,
            can_send,
            can_receive,
            is_sentinel: false,
        }
    }

    /// The built-in receive-only reference account.
    pub fn sentinel(ledger: &impl Ledger, name: impl Into<String>, address: impl Into<String>) -> Self {
        let mut record = Self::new(ledger, name, address, String::new(), 0);
        record.is_sentinel = true;
        record
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret_key(&self) -> &str {
        self.secret_key.as_str()
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

    pub fn can_send(&self) -> bool {
        self.can_send
    }

    pub fn can_receive(&self) -> bool {
        self.can_receive
    }

    pub fn is_watch_only(&self) -> bool {
        self.secret_key.is_empty()
    }

    pub fn is_sentinel(&self) -> bool {
        self.is_sentinel
    }
}

impl Clone for AccountRecord {
    fn clone(&self) -> Self {
        AccountRecord {
            id: next_account_id(),
            name: self.name.clone(),
            address: self.address.clone(),
            secret_key: self.secret_key.clone(),
            sequence: self.sequence,
            can_send: self.can_send,
            can_receive: self.can_receive,
            is_sentinel: self.is_sentinel,
        }
    }
}

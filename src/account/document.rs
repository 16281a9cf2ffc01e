//! Persisted wallet document.
//!
//! ```text
//! { "version": 1, "salt": "<hex>", "passHashEnc": "<cipher-text>",
//!   "accounts": [ { "name", "address" },
//!                 { "name", "address", "sequence", "keyEncrypted" } ] }
//! ```

use serde::{Deserialize, Serialize};

use super::types::AccountRecord;
use crate::crypto::CipherSession;
use crate::error::{Result, WalletError};
use crate::ledger::Ledger;

pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub salt: String,
    #[serde(default)]
    pub pass_hash_enc: String,
    #[serde(default)]
    pub accounts: Vec<AccountEntry>,
}

impl WalletDocument {
    pub fn parse(text: &str) -> Result<Self> {
        let doc: WalletDocument =
            serde_json::from_str(text).map_err(|e| WalletError::MalformedDocument(e.to_string()))?;
        if doc.version > DOCUMENT_VERSION {
            return Err(WalletError::UnsupportedVersion(doc.version));
        }
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| WalletError::SerializeFailed(e.to_string()))
    }
}

/// One serialized account. Watch-only entries carry neither `sequence` nor
/// `keyEncrypted`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    // kept loose so a non-numeric value reports as a bad sequence, not a bad document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_encrypted: Option<String>,
}

impl AccountEntry {
    /// Serialize a record, sealing its seed with `session`.
    pub fn seal(record: &AccountRecord, session: &impl CipherSession, ledger: &impl Ledger) -> Result<Self> {
        if record.is_watch_only() {
            return Ok(AccountEntry {
                name: record.name().to_string(),
                address: record.address().to_string(),
                ..Default::default()
            });
        }

        // would be rejected on the next unlock
        if record.sequence() == 0 {
            return Err(WalletError::InvalidSequence { account: record.name().to_string() });
        }

        let seed = ledger.seed_from_secret(record.secret_key()).ok_or_else(|| {
            WalletError::SerializeFailed(format!("cannot derive seed for account {}", record.name()))
        })?;
        let key_encrypted = session
            .encrypt(&seed)
            .map_err(|e| WalletError::SerializeFailed(e.to_string()))?;

        Ok(AccountEntry {
            name: record.name().to_string(),
            address: record.address().to_string(),
            sequence: Some(serde_json::Value::from(record.sequence())),
            key_encrypted: Some(key_encrypted),
        })
    }

    /// Rebuild a record, decrypting and cross-checking its secret.
    pub fn open(&self, session: &impl CipherSession, ledger: &impl Ledger) -> Result<AccountRecord> {
        let key_encrypted = match self.key_encrypted.as_deref() {
            Some(k) if !k.is_empty() => k,
            _ => {
                if !ledger.validate_address(&self.address) {
                    return Err(WalletError::InvalidAddress { account: self.name.clone() });
                }
                return Ok(AccountRecord::new(ledger, self.name.as_str(), self.address.as_str(), "", 0));
            }
        };

        let sequence = self
            .sequence()
            .ok_or_else(|| WalletError::InvalidSequence { account: self.name.clone() })?;

        let decrypt_failed = || WalletError::DecryptFailed { account: self.name.clone() };
        let seed = session.decrypt(key_encrypted).map_err(|_| decrypt_failed())?;
        let secret = ledger.secret_from_seed(&seed).ok_or_else(decrypt_failed)?;
        let derived = ledger.address_from_secret(&secret).ok_or_else(decrypt_failed)?;

        if derived != self.address {
            return Err(WalletError::PasswordMismatch { account: self.name.clone() });
        }

        Ok(AccountRecord::new(ledger, self.name.as_str(), self.address.as_str(), secret, sequence))
    }

    /// Sequence if it is a positive integer that fits the ledger's counter.
    pub fn sequence(&self) -> Option<u32> {
        self.sequence
            .as_ref()?
            .as_u64()
            .filter(|s| *s > 0)
            .and_then(|s| u32::try_from(s).ok())
    }
}

//! Wallet store: the account collection plus the password session that
//! seals it.

use tracing::{debug, info, warn};

use super::document::{AccountEntry, WalletDocument, DOCUMENT_VERSION};
use super::types::{AccountId, AccountRecord};
use crate::config::ReferenceAccount;
use crate::crypto::{AesCipher, Cipher, CipherSession, KDF_ITERATIONS};
use crate::error::{Result, WalletError};
use crate::ledger::{Ledger, RippleLedger};

/// Salt plus the key derived from it, established by `initialize_new` or a
/// successful `unlock`.
struct Session<S> {
    salt_hex: String,
    cipher: S,
    pass_hash_enc: String,
}

pub struct WalletStore<C: Cipher = AesCipher, L: Ledger = RippleLedger> {
    accounts: Vec<AccountRecord>,
    session: Option<Session<C::Session>>,
    cipher: C,
    ledger: L,
    kdf_iterations: u32,
}

impl WalletStore {
    /// Store with the production cipher and ledger.
    pub fn new(reference: &ReferenceAccount) -> Self {
        Self::with_parts(AesCipher::new(), RippleLedger::new(), reference)
    }
}

impl<C: Cipher, L: Ledger> WalletStore<C, L> {
    /// Uninitialized store holding only the reference account.
    pub fn with_parts(cipher: C, ledger: L, reference: &ReferenceAccount) -> Self {
        let sentinel = AccountRecord::sentinel(&ledger, reference.name.as_str(), reference.address.as_str());
        WalletStore {
            accounts: vec![sentinel],
            session: None,
            cipher,
            ledger,
            kdf_iterations: KDF_ITERATIONS,
        }
    }

    /// Cheaper key setup for tests.
    #[cfg(test)]
    pub(crate) fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Start a new wallet under `password` with a fresh salt.
    ///
    /// Accounts already in memory are kept and get sealed under the new key on
    /// the next save.
    pub fn initialize_new(&mut self, password: &str) -> Result<()> {
        let salt_hex = self.cipher.generate_salt();
        let session = self.open_session(password, salt_hex)?;
        self.session = Some(session);
        info!("Wallet initialized with a new password");
        Ok(())
    }

    /// Unlock `document` with `password` and append its accounts.
    ///
    /// Either every account in the document is added or none is; on error
    /// the store is left exactly as it was.
    pub fn unlock(&mut self, document: &str, password: &str) -> Result<Vec<AccountId>> {
        let doc = WalletDocument::parse(document)?;
        if doc.salt.is_empty() {
            return Err(WalletError::MissingSalt);
        }

        let session = self.open_session(password, doc.salt.clone())?;
        if session.pass_hash_enc != doc.pass_hash_enc {
            warn!("Unlock rejected: incorrect password");
            return Err(WalletError::IncorrectPassword);
        }

        let staged = doc
            .accounts
            .iter()
            .map(|entry| entry.open(&session.cipher, &self.ledger))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                warn!("Unlock rejected: {}", e);
                e
            })?;

        let ids: Vec<AccountId> = staged.iter().map(AccountRecord::id).collect();
        self.accounts.extend(staged);
        self.session = Some(session);

        info!("Wallet unlocked, {} account(s) loaded", ids.len());
        Ok(ids)
    }

    /// Serialize every non-reference account into a wallet document.
    pub fn save(&self) -> Result<String> {
        let session = self.session.as_ref().ok_or(WalletError::NoSession)?;

        let accounts = self
            .accounts
            .iter()
            .filter(|a| !a.is_sentinel())
            .map(|a| AccountEntry::seal(a, &session.cipher, &self.ledger))
            .collect::<Result<Vec<_>>>()?;

        let doc = WalletDocument {
            version: DOCUMENT_VERSION,
            salt: session.salt_hex.clone(),
            pass_hash_enc: session.pass_hash_enc.clone(),
            accounts,
        };
        debug!("Serialized {} account(s)", doc.accounts.len());
        doc.to_json()
    }

    /// Build a record against this store's ledger without adding it.
    pub fn new_account(
        &self,
        name: impl Into<String>,
        address: impl Into<String>,
        secret_key: impl Into<String>,
        sequence: u32,
    ) -> AccountRecord {
        AccountRecord::new(&self.ledger, name, address, secret_key, sequence)
    }

    /// Generate a fresh keypair and add it as a sending account.
    pub fn generate_account(&mut self, name: impl Into<String>) -> AccountId {
        let keypair = self.ledger.generate_keypair();
        let record = AccountRecord::new(&self.ledger, name, keypair.address, keypair.secret, 1);
        let id = record.id();
        self.accounts.push(record);
        id
    }

    /// Append `record`. Refused if an account with the same id is present.
    pub fn add_account(&mut self, record: AccountRecord) -> Result<AccountId> {
        let id = record.id();
        if self.get_account(id).is_some() {
            return Err(WalletError::DuplicateAccount { id });
        }
        debug!("Adding account {}", record.address());
        self.accounts.push(record);
        Ok(id)
    }

    /// Remove the account with `id`. Unknown ids and the reference account
    /// are ignored.
    pub fn delete_account(&mut self, id: AccountId) -> Option<AccountRecord> {
        let pos = self.accounts.iter().position(|a| a.id() == id)?;
        if self.accounts[pos].is_sentinel() {
            warn!("Refusing to delete the reference account");
            return None;
        }
        let removed = self.accounts.remove(pos);
        debug!("Deleted account {}", removed.address());
        Some(removed)
    }

    pub fn get_account(&self, id: AccountId) -> Option<&AccountRecord> {
        self.accounts.iter().find(|a| a.id() == id)
    }

    pub fn get_account_mut(&mut self, id: AccountId) -> Option<&mut AccountRecord> {
        self.accounts.iter_mut().find(|a| a.id() == id)
    }

    /// First non-reference account with `address`.
    pub fn find_by_address(&self, address: &str) -> Option<&AccountRecord> {
        self.accounts
            .iter()
            .find(|a| !a.is_sentinel() && a.address() == address)
    }

    /// All accounts in insertion order, reference account first.
    pub fn accounts(&self) -> impl Iterator<Item = &AccountRecord> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn open_session(&self, password: &str, salt_hex: String) -> Result<Session<C::Session>> {
        let cipher = self
            .cipher
            .open_session(password, &salt_hex, self.kdf_iterations)
            .map_err(|e| WalletError::KeySetupFailed(e.to_string()))?;
        let token = self.cipher.password_hash(password);
        let pass_hash_enc = cipher
            .encrypt(&token)
            .map_err(|e| WalletError::KeySetupFailed(e.to_string()))?;

        Ok(Session { salt_hex, cipher, pass_hash_enc })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AesSession, CipherError};
    use std::cell::Cell;
    use std::rc::Rc;

    const ITERATIONS: u32 = 1_000;
    const GENESIS_SECRET: &str = "snoPBrXtMeMyMHUVTgbuqAfg1SUTb";
    const GENESIS_ADDRESS: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

    fn reference() -> ReferenceAccount {
        ReferenceAccount::default()
    }

    fn store() -> WalletStore {
        WalletStore::with_parts(AesCipher::new(), RippleLedger::new(), &reference()).with_kdf_iterations(ITERATIONS)
    }

    /// Counts decrypt calls made through its sessions.
    #[derive(Clone, Default)]
    struct CountingCipher {
        decrypts: Rc<Cell<usize>>,
    }

    struct CountingSession {
        inner: AesSession,
        decrypts: Rc<Cell<usize>>,
    }

    impl Cipher for CountingCipher {
        type Session = CountingSession;

        fn generate_salt(&self) -> String {
            AesCipher::new().generate_salt()
        }

        fn open_session(&self, password: &str, salt_hex: &str, iterations: u32) -> std::result::Result<CountingSession, CipherError> {
            Ok(CountingSession {
                inner: AesCipher::new().open_session(password, salt_hex, iterations)?,
                decrypts: self.decrypts.clone(),
            })
        }

        fn password_hash(&self, password: &str) -> String {
            AesCipher::new().password_hash(password)
        }
    }

    impl CipherSession for CountingSession {
        fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CipherError> {
            self.inner.encrypt(plaintext)
        }

        fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CipherError> {
            self.decrypts.set(self.decrypts.get() + 1);
            self.inner.decrypt(ciphertext)
        }
    }

    fn populated(password: &str) -> (WalletStore, String) {
        let mut s = store();
        s.initialize_new(password).unwrap();
        let kp = s.ledger().generate_keypair();
        let alice = s.new_account("Alice", kp.address, kp.secret, 1);
        s.add_account(alice).unwrap();
        let bob = s.new_account("Bob", GENESIS_ADDRESS, "", 0);
        s.add_account(bob).unwrap();
        s.generate_account("Carol");
        let doc = s.save().unwrap();
        (s, doc)
    }

    fn tuples<'a>(accounts: impl Iterator<Item = &'a AccountRecord>) -> Vec<(String, String, u32, String)> {
        accounts
            .filter(|a| !a.is_sentinel())
            .map(|a| (a.name().to_string(), a.address().to_string(), a.sequence(), a.secret_key().to_string()))
            .collect()
    }

    #[test]
    fn test_new_store_holds_only_reference_account() {
        let s = store();
        assert!(!s.is_unlocked());
        assert_eq!(s.len(), 1);
        let first = s.accounts().next().unwrap();
        assert!(first.is_sentinel());
        assert_eq!(first.name(), reference().name);
    }

    #[test]
    fn test_default_parts() {
        let s = WalletStore::new(&reference());
        assert!(!s.is_unlocked());
        assert!(s.ledger().validate_address(GENESIS_ADDRESS));
        assert!(!s.is_empty());
    }

    #[test]
    fn test_production_stores_agree_on_key_setup() {
        let mut s = WalletStore::new(&reference());
        s.initialize_new("pw").unwrap();
        let alice = s.new_account("Alice", GENESIS_ADDRESS, GENESIS_SECRET, 3);
        s.add_account(alice).unwrap();
        let doc = s.save().unwrap();

        let mut reopened = WalletStore::new(&reference());
        let ids = reopened.unlock(&doc, "pw").unwrap();
        assert_eq!(reopened.get_account(ids[0]).unwrap().secret_key(), GENESIS_SECRET);
    }

    #[test]
    fn test_cloned_record_is_a_distinct_account() {
        let mut s = store();
        let id = s.generate_account("Erin");
        let copy = s.get_account(id).unwrap().clone();
        let copy_id = s.add_account(copy).unwrap();

        assert_ne!(copy_id, id);
        assert_eq!(s.len(), 3);
        s.delete_account(id).unwrap();
        assert_eq!(s.get_account(copy_id).unwrap().name(), "Erin");
    }

    #[test]
    fn test_save_requires_session() {
        let s = store();
        assert!(matches!(s.save(), Err(WalletError::NoSession)));
    }

    #[test]
    fn test_example_scenario() {
        let mut s = store();
        s.initialize_new("pw1").unwrap();
        let alice = s.new_account("Alice", GENESIS_ADDRESS, GENESIS_SECRET, 1);
        assert!(alice.can_send());
        s.add_account(alice).unwrap();

        let doc = s.save().unwrap();
        assert!(!doc.contains(GENESIS_SECRET));
        let parsed = WalletDocument::parse(&doc).unwrap();
        assert_eq!(parsed.accounts.len(), 1);
        assert!(parsed.accounts[0].key_encrypted.is_some());

        let mut fresh = store();
        let ids = fresh.unlock(&doc, "pw1").unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(fresh.get_account(ids[0]).unwrap().secret_key(), GENESIS_SECRET);

        let mut other = store();
        assert!(matches!(other.unlock(&doc, "wrong"), Err(WalletError::IncorrectPassword)));
    }

    #[test]
    fn test_round_trip_preserves_accounts() {
        let (original, doc) = populated("pw");
        let mut reloaded = store();
        let ids = reloaded.unlock(&doc, "pw").unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(tuples(original.accounts()), tuples(reloaded.accounts()));
        assert!(reloaded.is_unlocked());

        // the reloaded store saves the same document
        assert_eq!(reloaded.save().unwrap(), doc);
    }

    #[test]
    fn test_reference_account_never_saved() {
        let (s, doc) = populated("pw");
        let reference = s.accounts().next().unwrap();
        assert!(reference.is_sentinel());

        let parsed = WalletDocument::parse(&doc).unwrap();
        assert_eq!(parsed.accounts.len(), s.len() - 1);
        assert!(!doc.contains(reference.name()));
    }

    #[test]
    fn test_reference_account_survives_reordering() {
        let (mut s, _) = populated("pw");
        let first_real = s.accounts().find(|a| !a.is_sentinel()).unwrap().id();
        s.delete_account(first_real).unwrap();

        let doc = s.save().unwrap();
        let parsed = WalletDocument::parse(&doc).unwrap();
        assert_eq!(parsed.accounts.len(), 2);
        assert!(parsed.accounts.iter().all(|e| e.name != reference().name));
    }

    #[test]
    fn test_wrong_password_never_decrypts() {
        let (_, doc) = populated("pw");
        let counting = CountingCipher::default();
        let mut s =
            WalletStore::with_parts(counting.clone(), RippleLedger::new(), &reference()).with_kdf_iterations(ITERATIONS);

        assert!(matches!(s.unlock(&doc, "nope"), Err(WalletError::IncorrectPassword)));
        assert_eq!(counting.decrypts.get(), 0);
        assert!(!s.is_unlocked());

        let ids = s.unlock(&doc, "pw").unwrap();
        assert_eq!(counting.decrypts.get(), 2);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_corrupt_entry_loads_nothing() {
        let (_, doc) = populated("pw");
        let mut parsed = WalletDocument::parse(&doc).unwrap();
        // Carol is last; tamper with her sealed seed
        let last = parsed.accounts.last_mut().unwrap();
        let mut key = last.key_encrypted.take().unwrap();
        let flipped = if key.starts_with("00") { "11" } else { "00" };
        key.replace_range(0..2, flipped);
        last.key_encrypted = Some(key);
        let tampered = parsed.to_json().unwrap();

        let mut s = store();
        s.initialize_new("local").unwrap();
        let before = s.save().unwrap();
        let len = s.len();

        let err = s.unlock(&tampered, "pw").unwrap_err();
        assert!(matches!(err, WalletError::DecryptFailed { ref account } if account == "Carol"));
        assert_eq!(s.len(), len);
        // session untouched as well
        assert_eq!(s.save().unwrap(), before);
    }

    #[test]
    fn test_swapped_address_is_password_mismatch() {
        let (_, doc) = populated("pw");
        let mut parsed = WalletDocument::parse(&doc).unwrap();
        let other = RippleLedger::new().generate_keypair();
        parsed.accounts[0].address = other.address;
        let tampered = parsed.to_json().unwrap();

        let mut s = store();
        assert!(matches!(s.unlock(&tampered, "pw"), Err(WalletError::PasswordMismatch { ref account }) if account == "Alice"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_invalid_watch_only_address_fails_load() {
        let (_, doc) = populated("pw");
        let mut parsed = WalletDocument::parse(&doc).unwrap();
        parsed.accounts[1].address = "rNotValid".to_string();
        let tampered = parsed.to_json().unwrap();

        let mut s = store();
        assert!(matches!(s.unlock(&tampered, "pw"), Err(WalletError::InvalidAddress { ref account }) if account == "Bob"));
    }

    #[test]
    fn test_invalid_sequence_fails_load() {
        let (_, doc) = populated("pw");
        let mut parsed = WalletDocument::parse(&doc).unwrap();
        parsed.accounts[2].sequence = Some(serde_json::json!(0));
        let tampered = parsed.to_json().unwrap();

        let mut s = store();
        assert!(matches!(s.unlock(&tampered, "pw"), Err(WalletError::InvalidSequence { ref account }) if account == "Carol"));
    }

    #[test]
    fn test_missing_salt_and_malformed_document() {
        let mut s = store();
        assert!(matches!(s.unlock("{ oops", "pw"), Err(WalletError::MalformedDocument(_))));
        assert!(matches!(s.unlock(r#"{"version":1,"accounts":[]}"#, "pw"), Err(WalletError::MissingSalt)));
        assert!(matches!(s.unlock(r#"{"salt":""}"#, "pw"), Err(WalletError::MissingSalt)));
        assert!(matches!(s.unlock(r#"{"salt":"not-hex"}"#, "pw"), Err(WalletError::KeySetupFailed(_))));
    }

    #[test]
    fn test_unlock_appends_to_existing_accounts() {
        let (_, doc) = populated("pw");
        let mut s = store();
        s.initialize_new("pw").unwrap();
        s.generate_account("Local");

        let ids = s.unlock(&doc, "pw").unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_collection_operations() {
        let mut s = store();
        let id = s.generate_account("Dave");
        assert_eq!(s.get_account(id).unwrap().name(), "Dave");
        assert!(s.get_account(id).unwrap().can_send());
        assert_eq!(s.get_account(id).unwrap().sequence(), 1);

        s.get_account_mut(id).unwrap().set_sequence(7);
        assert_eq!(s.get_account(id).unwrap().sequence(), 7);

        let address = s.get_account(id).unwrap().address().to_string();
        assert_eq!(s.find_by_address(&address).map(AccountRecord::id), Some(id));

        assert!(s.delete_account(id).is_some());
        assert!(s.get_account(id).is_none());
        // deleting again is silent
        assert!(s.delete_account(id).is_none());
        assert!(s.delete_account(u64::MAX).is_none());
    }

    #[test]
    fn test_reference_account_cannot_be_deleted() {
        let mut s = store();
        let id = s.accounts().next().unwrap().id();
        assert!(s.delete_account(id).is_none());
        assert_eq!(s.len(), 1);
        assert!(s.find_by_address(&reference().address).is_none());
    }

    #[test]
    fn test_mutations_persist() {
        let (mut s, _) = populated("pw");
        let id = s.accounts().find(|a| a.name() == "Alice").unwrap().id();
        s.get_account_mut(id).unwrap().set_name("Alicia");
        s.get_account_mut(id).unwrap().set_sequence(12);
        let doc = s.save().unwrap();

        let mut reloaded = store();
        reloaded.unlock(&doc, "pw").unwrap();
        let alicia = reloaded.accounts().find(|a| a.name() == "Alicia").unwrap();
        assert_eq!(alicia.sequence(), 12);
        assert!(alicia.can_send());
    }

    #[test]
    fn test_reinitialize_reseals_under_new_password() {
        let (mut s, _) = populated("old");
        s.initialize_new("new").unwrap();
        let doc = s.save().unwrap();

        assert!(matches!(store().unlock(&doc, "old"), Err(WalletError::IncorrectPassword)));
        assert_eq!(store().unlock(&doc, "new").unwrap().len(), 3);
    }

    #[test]
    fn test_empty_password_rejected() {
        let mut s = store();
        assert!(matches!(s.initialize_new(""), Err(WalletError::KeySetupFailed(_))));
        assert!(!s.is_unlocked());
    }
}

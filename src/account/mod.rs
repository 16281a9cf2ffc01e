//! Account records and the password-protected wallet store.
//!
//! - Account records with derived send/receive capabilities
//! - Versioned wallet document with sealed secrets
//! - All-or-nothing unlock

pub mod document;
pub mod store;
pub mod types;

pub use document::{AccountEntry, WalletDocument, DOCUMENT_VERSION};
pub use store::WalletStore;
pub use types::{AccountId, AccountRecord};

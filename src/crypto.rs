//! Password-based sealing of account secrets.
//!
//! The wallet talks to the cipher through [`Cipher`] and [`CipherSession`] so
//! the store can be exercised with test doubles. [`AesCipher`] is the
//! production implementation: PBKDF2-HMAC-SHA256 key setup and AES-256-GCM
//! with a synthetic (HMAC-derived) nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

pub const SALT_LEN: usize = 16;
/// PBKDF2 rounds for every wallet. Not recorded in the wallet file, so it
/// must never change.
pub const KDF_ITERATIONS: u32 = 100_000;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid salt: {0}")]
    InvalidSalt(String),
    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Factory for password-derived sessions.
pub trait Cipher {
    type Session: CipherSession;

    /// Fresh random salt, hex encoded.
    fn generate_salt(&self) -> String;

    /// Derive a session key from the password and salt.
    fn open_session(
        &self,
        password: &str,
        salt_hex: &str,
        iterations: u32,
    ) -> Result<Self::Session, CipherError>;

    /// Deterministic fixed-length token used only for the password check.
    fn password_hash(&self, password: &str) -> String;
}

/// Session-bound symmetric encryption of short strings.
///
/// `encrypt` must be deterministic for a given session and plaintext: the
/// wallet verifies a candidate password by comparing ciphertexts.
pub trait CipherSession {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AesCipher;

impl AesCipher {
    pub fn new() -> Self {
        AesCipher
    }
}

impl Cipher for AesCipher {
    type Session = AesSession;

    fn generate_salt(&self) -> String {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        hex::encode(salt)
    }

    fn open_session(
        &self,
        password: &str,
        salt_hex: &str,
        iterations: u32,
    ) -> Result<AesSession, CipherError> {
        if password.is_empty() {
            return Err(CipherError::InvalidParameters("empty password".to_string()));
        }
        if iterations == 0 {
            return Err(CipherError::InvalidParameters("zero iterations".to_string()));
        }
        let salt = hex::decode(salt_hex).map_err(|e| CipherError::InvalidSalt(e.to_string()))?;
        if salt.is_empty() {
            return Err(CipherError::InvalidSalt("empty salt".to_string()));
        }

        // 32 bytes AES-256 key, 32 bytes nonce MAC key
        let mut derived = [0u8; 64];
        pbkdf2::<HmacSha256>(password.as_bytes(), &salt, iterations, &mut derived);

        let aead = Aes256Gcm::new_from_slice(&derived[..32])
            .map_err(|_| CipherError::InvalidParameters("bad key length".to_string()));
        let mut mac_key = [0u8; 32];
        mac_key.copy_from_slice(&derived[32..]);
        derived.zeroize();

        Ok(AesSession { aead: aead?, mac_key })
    }

    fn password_hash(&self, password: &str) -> String {
        hex::encode(Sha256::digest(password.as_bytes()))
    }
}

pub struct AesSession {
    aead: Aes256Gcm,
    mac_key: [u8; 32],
}

impl AesSession {
    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN], CipherError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac_key)
            .map_err(|_| CipherError::EncryptionFailed)?;
        mac.update(plaintext);
        let tag = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&tag[..NONCE_LEN]);
        Ok(nonce)
    }
}

impl CipherSession for AesSession {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce_bytes = self.synthetic_nonce(plaintext.as_bytes())?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .aead
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&ciphertext);
        Ok(hex::encode(blob))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let blob = hex::decode(ciphertext).map_err(|_| CipherError::DecryptionFailed)?;
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CipherError::DecryptionFailed);
        }

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let plaintext = self
            .aead
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| CipherError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
    }
}

impl Drop for AesSession {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

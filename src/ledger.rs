//! Address and key handling for the ledger.
//!
//! [`RippleLedger`] covers the classic secp256k1 key family of the XRP
//! Ledger: 16-byte family seeds encoded as `s...` secrets, and `r...`
//! addresses derived from the account public key.

use rand::rngs::OsRng;
use rand::RngCore;
use ripemd::Ripemd160;
use secp256k1::{PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};

const ACCOUNT_ID_PREFIX: u8 = 0x00;
const FAMILY_SEED_PREFIX: u8 = 0x21;
const SEED_LEN: usize = 16;
const ACCOUNT_ID_LEN: usize = 20;
const CHECKSUM_LEN: usize = 4;

/// A freshly generated account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keypair {
    pub address: String,
    pub secret: String,
}

/// Ledger-protocol key operations the wallet depends on.
pub trait Ledger {
    fn validate_address(&self, address: &str) -> bool;

    /// Address controlled by `secret`, or `None` if the secret does not parse.
    fn address_from_secret(&self, secret: &str) -> Option<String>;

    fn generate_keypair(&self) -> Keypair;

    /// Compact hex form of the seed behind `secret`.
    fn seed_from_secret(&self, secret: &str) -> Option<String>;

    fn secret_from_seed(&self, seed_hex: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RippleLedger;

impl RippleLedger {
    pub fn new() -> Self {
        RippleLedger
    }

    fn address_from_seed(seed: &[u8]) -> Option<String> {
        let public_key = account_public_key(seed)?;
        let account_id = Ripemd160::digest(Sha256::digest(public_key));
        Some(encode_check(ACCOUNT_ID_PREFIX, &account_id))
    }
}

impl Ledger for RippleLedger {
    fn validate_address(&self, address: &str) -> bool {
        decode_check(ACCOUNT_ID_PREFIX, address, ACCOUNT_ID_LEN).is_some()
    }

    fn address_from_secret(&self, secret: &str) -> Option<String> {
        let seed = decode_check(FAMILY_SEED_PREFIX, secret, SEED_LEN)?;
        Self::address_from_seed(&seed)
    }

    fn generate_keypair(&self) -> Keypair {
        loop {
            let mut seed = [0u8; SEED_LEN];
            OsRng.fill_bytes(&mut seed);
            if let Some(address) = Self::address_from_seed(&seed) {
                return Keypair {
                    address,
                    secret: encode_check(FAMILY_SEED_PREFIX, &seed),
                };
            }
        }
    }

    fn seed_from_secret(&self, secret: &str) -> Option<String> {
        decode_check(FAMILY_SEED_PREFIX, secret, SEED_LEN).map(hex::encode_upper)
    }

    fn secret_from_seed(&self, seed_hex: &str) -> Option<String> {
        let seed = hex::decode(seed_hex).ok()?;
        if seed.len() != SEED_LEN {
            return None;
        }
        Some(encode_check(FAMILY_SEED_PREFIX, &seed))
    }
}

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(Sha256::digest(payload));
    let mut sum = [0u8; CHECKSUM_LEN];
    sum.copy_from_slice(&digest[..CHECKSUM_LEN]);
    sum
}

fn encode_check(version: u8, data: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + data.len() + CHECKSUM_LEN);
    payload.push(version);
    payload.extend_from_slice(data);
    let sum = checksum(&payload);
    payload.extend_from_slice(&sum);

    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string()
}

fn decode_check(version: u8, encoded: &str, data_len: usize) -> Option<Vec<u8>> {
    let raw = bs58::decode(encoded)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .ok()?;
    if raw.len() != 1 + data_len + CHECKSUM_LEN {
        return None;
    }

    let (payload, sum) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if payload[0] != version || &checksum(payload)[..] != sum {
        return None;
    }
    Some(payload[1..].to_vec())
}

/// First SHA-512-half of `input || [index] || counter` that is a valid
/// secp256k1 scalar.
fn derive_scalar(input: &[u8], account_index: Option<u32>) -> Option<SecretKey> {
    for counter in 0..=u32::MAX {
        let mut hasher = Sha512::new();
        hasher.update(input);
        if let Some(index) = account_index {
            hasher.update(index.to_be_bytes());
        }
        hasher.update(counter.to_be_bytes());
        let digest = hasher.finalize();

        if let Ok(key) = SecretKey::from_slice(&digest[..32]) {
            return Some(key);
        }
    }
    None
}

fn account_public_key(seed: &[u8]) -> Option<[u8; 33]> {
    let secp = Secp256k1::signing_only();

    let root = derive_scalar(seed, None)?;
    let root_public = PublicKey::from_secret_key(&secp, &root).serialize();

    let intermediate = derive_scalar(&root_public, Some(0))?;
    let tweak = Scalar::from_be_bytes(intermediate.secret_bytes()).ok()?;
    let account = root.add_tweak(&tweak).ok()?;

    Some(PublicKey::from_secret_key(&secp, &account).serialize())
}

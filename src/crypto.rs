use argon2::{Algorithm, Argon2, Params, Version};
use bip39::Mnemonic;
use chacha20poly1305::{aead::{Aead, NewAead}, Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 24;
pub const ENTROPY_LEN: usize = 32;
pub const SEED_LEN: usize = 64;
const SEALED_VERSION: u8 = 1;
// version || mem_kib || time_cost || nonce
const SEALED_HEADER_LEN: usize = 1 + 4 + 4 + NONCE_LEN;
const AEAD_TAG_LEN: usize = 16;
/// Ceiling on the Argon2id cost accepted from a sealed envelope (1 GiB).
pub const MAX_KDF_MEM_KIB: u32 = 1024 * 1024;
pub const MAX_KDF_TIME_COST: u32 = 16;

/// Argon2id cost used when sealing a seed. The values are written into the
/// sealed envelope, so unlocking never depends on the current configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_mem_kib")]
    pub mem_kib: u32,
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
}

fn default_mem_kib() -> u32 { 64 * 1024 }   // 64 MiB
fn default_time_cost() -> u32 { 3 }

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams { mem_kib: default_mem_kib(), time_cost: default_time_cost() }
    }
}

impl KdfParams {
    pub const fn new(mem_kib: u32, time_cost: u32) -> Self {
        KdfParams { mem_kib, time_cost }
    }

    /// Rejects costs that would exhaust memory or stall an unlock.
    pub fn check(&self) -> Result<()> {
        if self.mem_kib > MAX_KDF_MEM_KIB || self.time_cost > MAX_KDF_TIME_COST {
            return Err(Error::Crypto(format!(
                "Argon2id cost {} KiB x {} exceeds the limit of {} KiB x {}",
                self.mem_kib, self.time_cost, MAX_KDF_MEM_KIB, MAX_KDF_TIME_COST
            )));
        }
        Ok(())
    }
}

pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    OsRng.fill_bytes(&mut out);
    out
}

/// `salt || password`. Every secret in an identity is derived from this value.
pub fn salted_password(salt: &[u8], password: &str) -> Zeroizing<Vec<u8>> {
    let mut salted = Zeroizing::new(Vec::with_capacity(salt.len() + password.len()));
    salted.extend_from_slice(salt);
    salted.extend_from_slice(password.as_bytes());
    salted
}

/// One-way digest stored next to the sealed seed for password verification.
pub fn password_digest(salted: &[u8]) -> [u8; 32] {
    Sha256::digest(salted).into()
}

/// Compares two digests without short-circuiting on the first differing byte.
pub fn digests_match(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Turns random entropy into a BIP39 mnemonic and stretches it into the
/// 64-byte seed the key tree is rooted in. The salted password, hex encoded,
/// is the mnemonic passphrase.
pub fn seed_from_entropy(entropy: &[u8], salted: &[u8]) -> Result<Zeroizing<[u8; SEED_LEN]>> {
    let mnemonic = Mnemonic::from_entropy(entropy)
        .map_err(|e| Error::Crypto(format!("invalid mnemonic entropy: {e}")))?;
    let passphrase = Zeroizing::new(hex::encode(salted));
    Ok(Zeroizing::new(mnemonic.to_seed(passphrase.as_str())))
}

fn cipher_key(salted: &[u8], salt: &[u8], params: KdfParams) -> Result<Zeroizing<[u8; 32]>> {
    params.check()?;
    let mut key = Zeroizing::new([0u8; 32]);
    let argon = Params::new(params.mem_kib, params.time_cost, 1, None)
        .map_err(|e| Error::Crypto(format!("invalid Argon2id params: {e}")))?;
    Argon2::new(Algorithm::Argon2id, Version::V0x13, argon)
        .hash_password_into(salted, salt, &mut key[..])
        .map_err(|e| Error::Crypto(format!("Argon2id key derivation failed: {e}")))?;
    Ok(key)
}

/// Encrypts `seed` under a key stretched from the salted password.
///
/// Layout: `version(1) || mem_kib(4, LE) || time_cost(4, LE) || nonce(24) || ciphertext`.
pub fn seal_seed(seed: &[u8], salted: &[u8], salt: &[u8], params: KdfParams) -> Result<Vec<u8>> {
    let key = cipher_key(salted, salt, params)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), seed)
        .map_err(|e| Error::Crypto(format!("failed to encrypt seed: {e}")))?;

    let mut sealed = Vec::with_capacity(SEALED_HEADER_LEN + ciphertext.len());
    sealed.push(SEALED_VERSION);
    sealed.extend_from_slice(&params.mem_kib.to_le_bytes());
    sealed.extend_from_slice(&params.time_cost.to_le_bytes());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Reverses [`seal_seed`]. An authentication failure means the wrong password.
pub fn open_seed(sealed: &[u8], salted: &[u8], salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < SEALED_HEADER_LEN + AEAD_TAG_LEN {
        return Err(Error::Crypto(format!("sealed seed is truncated ({} bytes)", sealed.len())));
    }
    if sealed[0] != SEALED_VERSION {
        return Err(Error::Crypto(format!("unsupported sealed seed version: {}", sealed[0])));
    }
    let mem_kib = u32::from_le_bytes([sealed[1], sealed[2], sealed[3], sealed[4]]);
    let time_cost = u32::from_le_bytes([sealed[5], sealed[6], sealed[7], sealed[8]]);
    let nonce = &sealed[9..SEALED_HEADER_LEN];
    let ciphertext = &sealed[SEALED_HEADER_LEN..];

    let key = cipher_key(salted, salt, KdfParams::new(mem_kib, time_cost))?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let seed = cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| Error::InvalidPassword)?;
    Ok(Zeroizing::new(seed))
}

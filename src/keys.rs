//! SLIP-10 Ed25519 key derivation.
//!
//! Ed25519 only has hardened children, so every path segment must carry
//! the `'` marker. The canonical account path is
//! [`CANONICAL_PATH`]; identities cache the public key found there.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub const CANONICAL_PATH: &str = "m/44'/4343'/0'/0'/0'";
const HARDENED: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn indices(&self) -> &[u32] {
        &self.0
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        DerivationPath(vec![44, 4343, 0, 0, 0])
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut segments = s.trim().split('/');
        if segments.next() != Some("m") {
            return Err(Error::Validation(format!("derivation path '{s}' must start with 'm'")));
        }
        let mut indices = Vec::new();
        for segment in segments {
            let index = segment
                .strip_suffix('\'')
                .ok_or_else(|| Error::Validation(format!("segment '{segment}' of '{s}' is not hardened")))?
                .parse::<u32>()
                .map_err(|_| Error::Validation(format!("segment '{segment}' of '{s}' is not an index")))?;
            if index >= HARDENED {
                return Err(Error::Validation(format!("index {index} of '{s}' is out of range")));
            }
            indices.push(index);
        }
        Ok(DerivationPath(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            write!(f, "/{index}'")?;
        }
        Ok(())
    }
}

pub fn derive_signing_key(seed: &[u8], path: &DerivationPath) -> SigningKey {
    let secret = Zeroizing::new(slip10_ed25519::derive_ed25519_private_key(seed, path.indices()));
    SigningKey::from_bytes(&secret)
}

pub fn derive_public_key(seed: &[u8], path: &DerivationPath) -> PublicKey {
    PublicKey(derive_signing_key(seed, path).verifying_key().to_bytes())
}

/// An Ed25519 public key, serialized as uppercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let bytes = hex::decode(text.trim())
            .map_err(|e| Error::Validation(format!("invalid public key hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| Error::Validation(format!("public key must be 32 bytes, got {}", b.len())))?;
        Ok(PublicKey(arr))
    }
}

impl From<&SigningKey> for PublicKey {
    fn from(key: &SigningKey) -> Self {
        PublicKey(key.verifying_key().to_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PublicKey::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

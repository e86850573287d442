//! Bitcoin-style block header hashing.
//!
//! Every field is given as hex already in little-endian wire order, so the
//! header is simply the concatenation of the decoded fields.

use crate::crypto::sha256;
use crate::error::{Error, Result};

pub const HEADER_LEN: usize = 80;

pub const GENESIS_VERSION: &str = "01000000";
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";
pub const GENESIS_MERKLE_ROOT: &str =
    "3BA3EDFD7A7B12B27AC72C3E67768F617FC81BC3888A51323A9FB8AA4B1E5E4A";
pub const GENESIS_TIMESTAMP: &str = "29AB5F49";
pub const GENESIS_BITS: &str = "FFFF001D";
pub const GENESIS_NONCE: &str = "1DAC2B7C";

/// Double SHA-256 of the header, byte-reversed into display order.
pub fn block_hash(
    version: &str,
    previous_hash: &str,
    merkle_root: &str,
    timestamp: &str,
    bits: &str,
    nonce: &str,
) -> Result<String> {
    let text = [version, previous_hash, merkle_root, timestamp, bits, nonce].concat();
    let header = hex::decode(&text).map_err(|e| Error::Validation(format!("block header hex: {e}")))?;
    if header.len() != HEADER_LEN {
        return Err(Error::Validation(format!(
            "block header is {} bytes, expected {HEADER_LEN}",
            header.len()
        )));
    }
    let mut digest = sha256(&sha256(&header));
    digest.reverse();
    Ok(hex::encode(digest))
}

pub fn genesis_block_hash() -> Result<String> {
    block_hash(
        GENESIS_VERSION,
        GENESIS_PREVIOUS_HASH,
        GENESIS_MERKLE_ROOT,
        GENESIS_TIMESTAMP,
        GENESIS_BITS,
        GENESIS_NONCE,
    )
}

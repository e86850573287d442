use serde::Deserialize;
use std::{fs, path::Path};
use anyhow::{anyhow, Context, Result};

use crate::contract::{
    ContractEnvelope, NetworkType, BLOCKS_IN_ONE_YEAR, DEFAULT_CURRENCY, DEFAULT_DEADLINE,
    DEFAULT_MAX_FEE, TESTNET_GENERATION_HASH,
};
use crate::crypto::KdfParams;

/// Default configuration shipped inside the binary.
pub const EMBEDDED_CONFIG: &str = include_str!("../config.toml");

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: Storage,
    #[serde(default)]
    pub kdf: KdfParams,
    #[serde(default)]
    pub network: Network,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Storage {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Network {
    #[serde(default)]
    pub kind: NetworkType,
    #[serde(default = "default_generation_hash")]
    pub generation_hash: String,
    #[serde(default = "default_max_fee")]
    pub max_fee: u64,
    #[serde(default = "default_deadline")]
    pub deadline: u64,
    #[serde(default = "default_rental_blocks")]
    pub namespace_rental_blocks: u64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Network {
    fn default() -> Self {
        Network {
            kind: NetworkType::default(),
            generation_hash: default_generation_hash(),
            max_fee: default_max_fee(),
            deadline: default_deadline(),
            namespace_rental_blocks: default_rental_blocks(),
            currency: default_currency(),
        }
    }
}

fn default_generation_hash() -> String { TESTNET_GENERATION_HASH.into() }
fn default_max_fee() -> u64 { DEFAULT_MAX_FEE }
fn default_deadline() -> u64 { DEFAULT_DEADLINE }
fn default_rental_blocks() -> u64 { BLOCKS_IN_ONE_YEAR }   // one year of 15 s blocks
fn default_currency() -> String { DEFAULT_CURRENCY.into() }

impl Config {
    /// Envelope handed to every concern a command runs.
    ///
    /// # Errors
    /// * The generation hash is not 32 bytes of hex.
    pub fn envelope(&self) -> Result<ContractEnvelope> {
        let bytes = hex::decode(self.network.generation_hash.trim())
            .with_context(|| "🔗  network.generation_hash is not hex")?;
        let generation_hash: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow!("🔗  network.generation_hash must be 32 bytes, got {}", b.len()))?;
        Ok(ContractEnvelope {
            network: self.network.kind,
            generation_hash,
            max_fee: self.network.max_fee,
            deadline: self.network.deadline,
            namespace_rental_blocks: self.network.namespace_rental_blocks,
            currency: self.network.currency.clone(),
        })
    }
}

/// Read the TOML file at `p` and deserialize into `Config`.
/// *Adds context* so user errors print a friendlier message.
///
/// # Errors
/// * Returns an anyhow::Error if the file cannot be read or parsed.
pub fn load<P: AsRef<Path>>(p: P) -> Result<Config> {
    let text = fs::read_to_string(&p)
        .with_context(|| format!("🗂️  couldn’t read config file {}", p.as_ref().display()))?;
    load_from_str(&text)
}

pub fn load_from_str(text: &str) -> Result<Config> {
    toml::from_str(text)
        .with_context(|| "📝  invalid TOML in config file".to_string())
}

// Library interface for minibiz
// The binary and the integration tests both go through these modules.

pub mod error;
pub mod config;
pub mod crypto;
pub mod keys;
pub mod identity;
pub mod product;
pub mod contract;
pub mod concerns;
pub mod business;
pub mod backup;
pub mod qr;
pub mod blockhash;
pub mod prompt;

pub use error::{Error, Result};
pub use identity::{Identity, IdentityRecord};
pub use product::Product;
pub use contract::{ContractEnvelope, DigitalContract, NetworkType, SignedContract, TransactionRequest};
pub use concerns::{Concern, ConcernInputs};
pub use business::{Business, BusinessRecord};
pub use backup::{slugify, BackupStore};
pub use qr::{PngQrRenderer, QrRenderer};

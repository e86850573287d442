//! Concerns turn business state into unsigned digital contracts.
//!
//! Each concern borrows the identities and products it needs, builds the
//! operations, and returns them bundled. Signing, persistence and output
//! happen elsewhere.

use zeroize::Zeroizing;

use crate::contract::{ContractEnvelope, DigitalContract};
use crate::error::Result;

mod couponization;
mod gamification;
mod governance;
mod identification;
mod payment;
mod supply_chain;
mod tokenization;

pub use couponization::Couponization;
pub use gamification::Gamification;
pub use governance::{multisig_thresholds, Governance};
pub use identification::{alias_levels, Identification, MAX_ALIAS_LEVELS};
pub use payment::PaymentProcessing;
pub use supply_chain::SupplyChainSale;
pub use tokenization::Tokenization;

/// Inputs resolved at the command boundary.
#[derive(Default)]
pub struct ConcernInputs {
    pub envelope: ContractEnvelope,
    /// Per-identity passwords, index-aligned with the identities of an
    /// [`Identification`] concern.
    pub passwords: Vec<Zeroizing<String>>,
}

impl ConcernInputs {
    pub fn new(envelope: ContractEnvelope) -> Self {
        ConcernInputs { envelope, passwords: Vec::new() }
    }

    pub fn with_passwords(mut self, passwords: Vec<Zeroizing<String>>) -> Self {
        self.passwords = passwords;
        self
    }
}

pub trait Concern {
    fn name(&self) -> &'static str;

    /// Builds the contract. Must not embed any signature.
    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract>;
}

use super::{Concern, ConcernInputs};
use crate::contract::{DigitalContract, Operation};
use crate::error::{Error, Result};
use crate::identity::Identity;

/// Converts the governor account into a multisig account co-signed by the
/// business identities.
pub struct Governance<'a> {
    governor: &'a Identity,
    cosignatories: &'a [Identity],
}

impl<'a> Governance<'a> {
    pub fn new(governor: &'a Identity, cosignatories: &'a [Identity]) -> Self {
        Governance { governor, cosignatories }
    }
}

/// `(min_approval, min_removal)` for `count` cosignatories.
///
/// Approval drops by one above two cosignatories, removal above one.
pub fn multisig_thresholds(count: u32) -> (u32, u32) {
    let approval = if count > 2 { count - 1 } else { count };
    let removal = if count > 1 { count - 1 } else { count };
    (approval, removal)
}

impl Concern for Governance<'_> {
    fn name(&self) -> &'static str {
        "governance"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        if self.cosignatories.is_empty() {
            return Err(Error::Configuration(
                "no identities configured, add identities information first".into(),
            ));
        }

        let network = inputs.envelope.network;
        let count = u32::try_from(self.cosignatories.len())
            .map_err(|_| Error::Validation("too many cosignatories".into()))?;
        let (min_approval, min_removal) = multisig_thresholds(count);
        let operation = Operation::MultisigAccountModification {
            min_approval,
            min_removal,
            additions: self.cosignatories.iter().map(|c| c.address(network)).collect(),
            deletions: Vec::new(),
        };
        Ok(DigitalContract::new(
            &inputs.envelope,
            vec![operation.signed_off_by(self.governor.public_key())],
        ))
    }
}

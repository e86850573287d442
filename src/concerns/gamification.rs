use super::{Concern, ConcernInputs};
use crate::contract::{DigitalContract, Operation};
use crate::error::Result;
use crate::identity::Identity;

pub const REWARD_MESSAGE: &str = "It is great to work with you! Rewarded with MiniBusiness";

/// Sends an appreciation message from the owner to an employee.
pub struct Gamification<'a> {
    owner: &'a Identity,
    employee: &'a Identity,
}

impl<'a> Gamification<'a> {
    pub fn new(owner: &'a Identity, employee: &'a Identity) -> Self {
        Gamification { owner, employee }
    }
}

impl Concern for Gamification<'_> {
    fn name(&self) -> &'static str {
        "gamification"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        let reward = Operation::Transfer {
            recipient: self.employee.address(inputs.envelope.network),
            mosaics: Vec::new(),
            message: REWARD_MESSAGE.to_string(),
        };
        Ok(DigitalContract::new(
            &inputs.envelope,
            vec![reward.signed_off_by(self.owner.public_key())],
        ))
    }
}

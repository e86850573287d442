use rand::rngs::OsRng;
use rand::RngCore;

use super::{Concern, ConcernInputs};
use crate::contract::{DigitalContract, MosaicFlags, MosaicId, Operation, SupplyAction};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::product::Product;

/// Defines one mosaic per product and mints its stock count.
pub struct Tokenization<'a> {
    owner: &'a Identity,
    products: &'a [Product],
}

impl<'a> Tokenization<'a> {
    pub fn new(owner: &'a Identity, products: &'a [Product]) -> Self {
        Tokenization { owner, products }
    }
}

impl Concern for Tokenization<'_> {
    fn name(&self) -> &'static str {
        "tokenization"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        if self.products.is_empty() {
            return Err(Error::Configuration(
                "no products configured, add products information first".into(),
            ));
        }

        let signer = self.owner.public_key();
        let owner = self.owner.address(inputs.envelope.network);
        let mut operations = Vec::with_capacity(self.products.len() * 2);
        for product in self.products {
            let nonce = OsRng.next_u32();
            let mosaic_id = MosaicId::from_nonce(nonce, &owner);
            operations.push(
                Operation::MosaicDefinition {
                    nonce,
                    mosaic_id,
                    flags: MosaicFlags { supply_mutable: false, transferable: false, restrictable: true },
                    divisibility: 0,
                    duration: 0,
                }
                .signed_off_by(signer),
            );
            operations.push(
                Operation::MosaicSupplyChange {
                    mosaic_id,
                    action: SupplyAction::Increase,
                    delta: product.count,
                }
                .signed_off_by(signer),
            );
        }
        Ok(DigitalContract::new(&inputs.envelope, operations))
    }
}

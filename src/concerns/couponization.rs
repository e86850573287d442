use super::{Concern, ConcernInputs};
use crate::contract::{DigitalContract, Operation};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::product::Product;

/// A shareable "price quote request" coupon: a message-only transfer to the
/// owner. Holds nothing sensitive.
pub struct Couponization<'a> {
    owner: &'a Identity,
    product: &'a Product,
    quantity: u64,
}

impl<'a> Couponization<'a> {
    pub fn new(owner: &'a Identity, product: &'a Product, quantity: u64) -> Self {
        Couponization { owner, product, quantity }
    }

    pub fn message(&self) -> String {
        format!("Price Quote Request for {} {}", self.quantity, self.product.sku)
    }
}

impl Concern for Couponization<'_> {
    fn name(&self) -> &'static str {
        "couponization"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        if self.quantity == 0 {
            return Err(Error::Validation("coupon quantity must be at least 1".into()));
        }
        let request = Operation::Transfer {
            recipient: self.owner.address(inputs.envelope.network),
            mosaics: Vec::new(),
            message: self.message(),
        };
        Ok(DigitalContract::new(
            &inputs.envelope,
            vec![request.signed_off_by(self.owner.public_key())],
        ))
    }
}

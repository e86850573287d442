use super::{Concern, ConcernInputs};
use crate::contract::{
    DigitalContract, Mosaic, NamespaceId, Operation, UnresolvedMosaic, CURRENCY_DIVISIBILITY,
};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::product::Product;

/// A payment request for one product, priced in the reference currency and
/// addressed to the owner.
pub struct PaymentProcessing<'a> {
    owner: &'a Identity,
    product: &'a Product,
}

impl<'a> PaymentProcessing<'a> {
    pub fn new(owner: &'a Identity, product: &'a Product) -> Self {
        PaymentProcessing { owner, product }
    }
}

/// Price in atomic currency units (`price × 10^6`, rounded).
pub fn atomic_amount(price: f64) -> Result<u64> {
    let scaled = (price * 10f64.powi(CURRENCY_DIVISIBILITY as i32)).round();
    if !scaled.is_finite() || scaled < 0.0 || scaled > u64::MAX as f64 {
        return Err(Error::Validation(format!("price {price} cannot be paid")));
    }
    Ok(scaled as u64)
}

impl Concern for PaymentProcessing<'_> {
    fn name(&self) -> &'static str {
        "payment_processing"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        let currency = NamespaceId::from_name(&inputs.envelope.currency);
        let payment = Operation::Transfer {
            recipient: self.owner.address(inputs.envelope.network),
            mosaics: vec![Mosaic {
                id: UnresolvedMosaic::Namespace(currency),
                amount: atomic_amount(self.product.price)?,
            }],
            message: format!("Payment Request for {}", self.product.sku),
        };
        Ok(DigitalContract::new(
            &inputs.envelope,
            vec![payment.signed_off_by(self.owner.public_key())],
        ))
    }
}

use super::{Concern, ConcernInputs};
use crate::contract::{Address, DigitalContract, Mosaic, MosaicId, Operation, UnresolvedMosaic};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::keys::PublicKey;
use crate::product::Product;

/// Tracks the sale of one unit of a tokenized product in two legs: the
/// owner hands it to a transporter, who delivers it to the customer. Each
/// leg is signed off by the party giving the unit away.
pub struct SupplyChainSale<'a> {
    owner: &'a Identity,
    transporter: &'a Identity,
    customer: PublicKey,
    product: &'a Product,
}

impl<'a> SupplyChainSale<'a> {
    pub fn new(owner: &'a Identity, transporter: &'a Identity, customer: PublicKey, product: &'a Product) -> Self {
        SupplyChainSale { owner, transporter, customer, product }
    }

    fn token(&self) -> Result<MosaicId> {
        let id = self.product.token_id.as_deref().ok_or_else(|| {
            Error::Configuration(format!(
                "product '{}' is not tokenized, run the \"tokenise\" command first",
                self.product.sku
            ))
        })?;
        MosaicId::from_hex(id)
    }
}

impl Concern for SupplyChainSale<'_> {
    fn name(&self) -> &'static str {
        "supply_chain_sale"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        let unit = Mosaic { id: UnresolvedMosaic::Mosaic(self.token()?), amount: 1 };
        let network = inputs.envelope.network;

        let transport = Operation::Transfer {
            recipient: self.transporter.address(network),
            mosaics: vec![unit],
            message: String::new(),
        };
        let delivery = Operation::Transfer {
            recipient: Address::from_public_key(&self.customer, network),
            mosaics: vec![unit],
            message: String::new(),
        };
        Ok(DigitalContract::new(
            &inputs.envelope,
            vec![
                transport.signed_off_by(self.owner.public_key()),
                delivery.signed_off_by(self.transporter.public_key()),
            ],
        ))
    }
}

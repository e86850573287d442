use std::collections::HashSet;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::concerns::{Concern, ConcernInputs};
use crate::contract::DigitalContract;
use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityRecord};
use crate::product::Product;

/// Snapshot written to the backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub name: String,
    #[serde(default)]
    pub debug: bool,
    pub governor: IdentityRecord,
    #[serde(default)]
    pub identities: Vec<IdentityRecord>,
    #[serde(default)]
    pub products: Vec<Product>,
}

/// A named business: its governor, the identities acting for it, and its
/// product catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BusinessRecord", into = "BusinessRecord")]
pub struct Business {
    name: String,
    debug: bool,
    governor: Identity,
    identities: Vec<Identity>,
    products: Vec<Product>,
}

impl Business {
    pub fn new(
        name: impl Into<String>,
        governor: Identity,
        identities: Vec<Identity>,
        products: Vec<Product>,
        debug: bool,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Validation("business name must not be empty".into()));
        }
        check_unique_skus(&products)?;
        if debug {
            tracing::debug!(business = %name, identities = identities.len(), "creating digital business");
        }
        Ok(Business { name, debug, governor, identities, products })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn governor(&self) -> &Identity {
        &self.governor
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Runs `concern` and hands back its unsigned contract.
    pub fn dispatch(&self, concern: &dyn Concern, inputs: &ConcernInputs) -> Result<DigitalContract> {
        tracing::debug!(business = %self.name, concern = concern.name(), "executing concern");
        let contract = concern.execute(inputs)?;
        tracing::debug!(concern = concern.name(), operations = contract.len(), "contract built");
        Ok(contract)
    }

    pub fn find_identity(&self, name: &str) -> Result<&Identity> {
        self.identities.iter().find(|i| i.name() == name).ok_or_else(|| {
            let known: Vec<&str> = self.identities.iter().map(Identity::name).collect();
            Error::NotFound(format!("identity '{name}' (known: {})", known.join(", ")))
        })
    }

    pub fn find_product(&self, sku: &str) -> Result<&Product> {
        self.products.iter().find(|p| p.sku == sku).ok_or_else(|| {
            let known: Vec<&str> = self.products.iter().map(|p| p.sku.as_str()).collect();
            Error::NotFound(format!("product '{sku}' (known: {})", known.join(", ")))
        })
    }

    pub fn add_identity(&mut self, identity: Identity) -> Result<()> {
        if self.identities.iter().any(|i| i.name() == identity.name()) {
            return Err(Error::Validation(format!("identity '{}' already exists", identity.name())));
        }
        self.identities.push(identity);
        Ok(())
    }

    /// Appends a catalogue entry. Existing products, and any token id
    /// they carry, are left as they are.
    pub fn add_product(&mut self, product: Product) -> Result<()> {
        if self.products.iter().any(|p| p.sku == product.sku) {
            return Err(Error::Validation(format!("product '{}' already exists", product.sku)));
        }
        self.products.push(product);
        Ok(())
    }

    /// Copies the mosaic ids defined by a tokenization contract onto the
    /// products, in catalogue order.
    pub fn assign_token_ids(&mut self, contract: &DigitalContract) -> Result<()> {
        let mosaics = contract.defined_mosaics();
        if mosaics.len() != self.products.len() {
            return Err(Error::Validation(format!(
                "contract defines {} tokens for {} products",
                mosaics.len(),
                self.products.len()
            )));
        }
        for (product, mosaic) in self.products.iter_mut().zip(mosaics) {
            product.token_id = Some(mosaic.to_hex());
        }
        Ok(())
    }

    pub fn unlock_governor(&self, password: &str) -> Result<SigningKey> {
        self.governor.unlock(password, None)
    }

    pub fn to_record(&self) -> BusinessRecord {
        BusinessRecord {
            name: self.name.clone(),
            debug: self.debug,
            governor: self.governor.to_record(),
            identities: self.identities.iter().map(Identity::to_record).collect(),
            products: self.products.clone(),
        }
    }

    pub fn from_record(record: BusinessRecord) -> Result<Self> {
        let governor = Identity::from_record(record.governor)?;
        let identities = record
            .identities
            .into_iter()
            .map(Identity::from_record)
            .collect::<Result<Vec<_>>>()?;
        check_unique_skus(&record.products)?;
        Ok(Business {
            name: record.name,
            debug: record.debug,
            governor,
            identities,
            products: record.products,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

fn check_unique_skus(products: &[Product]) -> Result<()> {
    let mut seen = HashSet::new();
    for product in products {
        if !seen.insert(product.sku.as_str()) {
            return Err(Error::Validation(format!("duplicate sku '{}'", product.sku)));
        }
    }
    Ok(())
}

impl TryFrom<BusinessRecord> for Business {
    type Error = Error;

    fn try_from(record: BusinessRecord) -> Result<Self> {
        Business::from_record(record)
    }
}

impl From<Business> for BusinessRecord {
    fn from(business: Business) -> Self {
        business.to_record()
    }
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A catalogue entry. `token_id` is set once the product has been tokenized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub sku: String,
    pub count: u64,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, count: u64, price: f64) -> Self {
        Product { name: name.into(), sku: sku.into(), count, price, token_id: None }
    }
}

impl Product {
    /// Builds a product from raw text fields, as typed on a terminal.
    pub fn from_fields(sku: &str, name: &str, count: &str, price: &str) -> Result<Self> {
        let invalid = |why: &str| Error::Validation(format!("product '{sku}': {why}"));

        let sku = sku.trim();
        let name = name.trim();
        if sku.is_empty() || name.is_empty() {
            return Err(invalid("SKU and name must not be empty"));
        }
        let count = count.trim().parse::<u64>().map_err(|_| invalid("count must be a whole number"))?;
        let price = price.trim().parse::<f64>().map_err(|_| invalid("price must be a number"))?;
        if !price.is_finite() || price < 0.0 {
            return Err(invalid("price must be a non-negative amount"));
        }
        Ok(Product::new(name, sku, count, price))
    }
}

/// Parses `SKU:NAME:COUNT:PRICE`. The name may itself contain `:`.
impl FromStr for Product {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let invalid = |why: &str| Error::Validation(format!("product '{line}': {why}"));

        let (sku, rest) = line.split_once(':').ok_or_else(|| invalid("expected SKU:NAME:COUNT:PRICE"))?;
        let mut tail = rest.rsplitn(3, ':');
        let price = tail.next().ok_or_else(|| invalid("missing price"))?;
        let count = tail.next().ok_or_else(|| invalid("missing count"))?;
        let name = tail.next().ok_or_else(|| invalid("missing name"))?;
        Product::from_fields(sku, name, count, price)
    }
}

/// Sample book catalogue offered by `create` on an interactive terminal.
pub fn example_products() -> Vec<Product> {
    vec![
        Product::new("My awesome book", "UBC21-34560015-01", 100, 10.0),
        Product::new("My other awesome book", "UBC21-34560015-02", 50, 20.0),
        Product::new("My third awesome book", "UBC21-34560015-03", 10000, 5.99),
    ]
}

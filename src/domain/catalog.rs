use super::money::Amount;
use crate::error::ServiceError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reference to a catalog entry, as stored in an order's item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub price: Decimal,
}

/// Result of pricing an order against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    /// Sum of unit prices rounded to two decimals.
    pub total: Decimal,
    /// Human-readable receipt lines ending in `Total: $x.yy`.
    pub message: String,
}

impl Receipt {
    /// The chargeable amount, or `None` when the order is free.
    pub fn chargeable(&self) -> Option<Amount> {
        Amount::new(self.total).ok()
    }
}

/// The storefront menu, keyed by item id.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    items: BTreeMap<ItemId, CatalogItem>,
}

impl Catalog {
    pub fn new(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    /// Five pizzas priced one to five dollars.
    pub fn standard() -> Self {
        Self::new((1..=5u32).map(|n| CatalogItem {
            id: ItemId(n),
            name: format!("Pizza {n}"),
            price: Decimal::from(n),
        }))
    }

    pub fn get(&self, id: ItemId) -> Option<&CatalogItem> {
        self.items.get(&id)
    }

    pub fn items(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.values()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks that every referenced item exists.
    pub fn validate(&self, items: &[ItemId]) -> Result<(), ServiceError> {
        match items.iter().find(|id| !self.items.contains_key(id)) {
            Some(unknown) => Err(ServiceError::ValidationError(format!(
                "Unknown catalog item: {unknown}"
            ))),
            None => Ok(()),
        }
    }

    /// Prices `items` and renders the receipt message.
    pub fn compile(&self, items: &[ItemId]) -> Result<Receipt, ServiceError> {
        let mut total = Decimal::ZERO;
        let mut message = String::new();

        for id in items {
            let item = self.get(*id).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown catalog item: {id}"))
            })?;
            total += item.price;
            message.push_str(&format!("\n{}: ${:.2}", item.name, item.price));
        }

        let total = total.round_dp(2);
        message.push_str(&format!("\n\nTotal: ${total:.2}"));

        Ok(Receipt { total, message })
    }
}

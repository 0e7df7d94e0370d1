use crate::domain::catalog::{Catalog, CatalogItem, ItemId};
use crate::error::{Result, ServiceError};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: u32,
    name: String,
    price: String,
}

impl TryFrom<CatalogRow> for CatalogItem {
    type Error = ServiceError;

    fn try_from(row: CatalogRow) -> Result<Self> {
        let raw = row.price.trim().trim_start_matches('$');
        let price: Decimal = raw.parse().map_err(|_| {
            ServiceError::ValidationError(format!("Invalid price for item {}: {:?}", row.id, row.price))
        })?;
        if price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "Negative price for item {}",
                row.id
            )));
        }
        if row.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Missing name for item {}",
                row.id
            )));
        }
        Ok(CatalogItem {
            id: ItemId(row.id),
            name: row.name.trim().to_string(),
            price: price.round_dp(2),
        })
    }
}

/// Reads catalog items from a CSV source with header `id,name,price`.
///
/// Prices may carry a leading `$`.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates catalog items.
    pub fn items(self) -> impl Iterator<Item = Result<CatalogItem>> {
        self.reader.into_deserialize().map(|result| {
            result
                .map_err(ServiceError::from)
                .and_then(|row: CatalogRow| CatalogItem::try_from(row))
        })
    }

    /// Reads the whole source. Any bad row, or an empty menu, is an error.
    pub fn into_catalog(self) -> Result<Catalog> {
        let items = self.items().collect::<Result<Vec<_>>>()?;
        let catalog = Catalog::new(items);
        if catalog.is_empty() {
            return Err(ServiceError::validation("Catalog has no items"));
        }
        Ok(catalog)
    }
}

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;
use crate::session::Session;

/// Wire shape of one cart line inside the session blob.
///
/// Prices are stored as strings so the blob survives JSON serialization
/// without decimal precision loss. This exact `{quantity, price}` mapping,
/// keyed by string product id, is the contract between requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLine {
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: String,
}

/// Per-line degradation marker surfaced by the enriched projection instead of
/// silently swallowing bad data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Priced,
    PriceUnparsable,
    ProductMissing,
}

/// Read-time projection of one cart line. Never persisted; rebuilt on every
/// enrichment pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product: Option<Product>,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub status: LineStatus,
}

/// Narrow catalog interface the cart needs for read-time enrichment.
#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn find_by_ids(
        &self,
        ids: &[ProductId],
        available_only: bool,
    ) -> Result<Vec<Product>, ApplicationError>;

    async fn find_available(&self, id: &ProductId) -> Result<Option<Product>, ApplicationError>;
}

/// Session-backed shopping cart.
///
/// The cart borrows the visitor's session and keeps its lines under a fixed,
/// configuration-supplied attribute. Every mutation writes the mapping back
/// into the session immediately; the surrounding request handler persists the
/// session once the handler completes.
pub struct SessionCart<'s> {
    session: &'s mut Session,
    key: String,
    lines: BTreeMap<String, StoredLine>,
}

impl<'s> SessionCart<'s> {
    /// Load the cart from the session, or start empty when the attribute is
    /// absent or not an object.
    pub fn load(session: &'s mut Session, key: impl Into<String>) -> Self {
        let key = key.into();
        let lines = match session.get(&key) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(id, raw)| {
                    serde_json::from_value::<StoredLine>(raw.clone())
                        .ok()
                        .map(|line| (id.clone(), line))
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        Self { session, key, lines }
    }

    /// Add a product or update its quantity.
    ///
    /// The unit price snapshot is captured when the line is first created and
    /// is not refreshed by later adds, even if the catalog price changed in
    /// between. A zero-quantity line is left in place; only `remove` deletes
    /// lines.
    pub fn add(&mut self, product: &Product, quantity: u32, override_quantity: bool) {
        let line = self.lines.entry(product.id.0.clone()).or_insert_with(|| StoredLine {
            quantity: 0,
            price: product.price.to_string(),
        });

        if override_quantity {
            line.quantity = quantity;
        } else {
            // Quantities come straight from client requests; clamp instead of
            // wrapping when an accumulate pushes past u32::MAX.
            line.quantity = line.quantity.saturating_add(quantity);
        }

        self.persist();
    }

    /// Delete a line. Silent no-op when the product is not in the cart.
    pub fn remove(&mut self, product_id: &ProductId) {
        if self.lines.remove(&product_id.0).is_some() {
            self.persist();
        }
    }

    /// Drop the whole cart attribute from the session. No-op when absent.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.session.remove(&self.key);
    }

    /// Total number of items: the sum of quantities, not the number of
    /// distinct lines. Does not touch the catalog.
    pub fn len(&self) -> u64 {
        self.lines.values().map(|line| u64::from(line.quantity)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total over the stored price snapshots. Lines whose snapshot fails to
    /// parse contribute zero and are skipped silently. Does not touch the
    /// catalog. The sum starts at `0.00` so an empty cart still renders with
    /// two decimal places.
    pub fn total_price(&self) -> Decimal {
        self.lines.values().fold(Decimal::new(0, 2), |total, line| {
            match Decimal::from_str(&line.price) {
                Ok(price) => total + price * Decimal::from(line.quantity),
                Err(_) => total,
            }
        })
    }

    /// Enriched, restartable projection of the cart.
    ///
    /// Resolves all line product ids against the catalog in one batched
    /// lookup restricted to available products; lines whose product no longer
    /// resolves stay in the projection with `product: None` and a
    /// `ProductMissing` status. The projection works on a private copy of the
    /// stored mapping and never mutates session state. Each call re-reads the
    /// lines and re-resolves the catalog, so two passes can differ when the
    /// catalog changed in between.
    pub async fn items(
        &self,
        catalog: &dyn ProductLookup,
    ) -> Result<Vec<CartItem>, ApplicationError> {
        if self.lines.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = self.lines.keys().cloned().map(ProductId).collect();
        let products = catalog.find_by_ids(&ids, true).await?;
        let by_id: HashMap<&str, &Product> =
            products.iter().map(|product| (product.id.0.as_str(), product)).collect();

        let items = self
            .lines
            .iter()
            .map(|(id, line)| {
                let product = by_id.get(id.as_str()).map(|found| (*found).clone());
                let (unit_price, price_ok) = match Decimal::from_str(&line.price) {
                    Ok(price) => (price, true),
                    Err(_) => (Decimal::new(0, 2), false),
                };
                let status = if !price_ok {
                    LineStatus::PriceUnparsable
                } else if product.is_none() {
                    LineStatus::ProductMissing
                } else {
                    LineStatus::Priced
                };

                CartItem {
                    product_id: ProductId(id.clone()),
                    product,
                    unit_price,
                    quantity: line.quantity,
                    line_total: unit_price * Decimal::from(line.quantity),
                    status,
                }
            })
            .collect();

        Ok(items)
    }

    fn persist(&mut self) {
        let map: serde_json::Map<String, Value> = self
            .lines
            .iter()
            .map(|(id, line)| {
                (
                    id.clone(),
                    serde_json::json!({ "quantity": line.quantity, "price": line.price }),
                )
            })
            .collect();
        self.session.insert(self.key.clone(), Value::Object(map));
    }
}

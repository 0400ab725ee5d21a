use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CartLineKey, PlacedOrderId, SourceStatus, StoreError, StoreRef, StoreType};

/// The uniqueness key of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacedOrderKey {
    pub store_type: StoreType,
    pub store_id: i64,
    pub store_order_id: String,
    pub trade_id: String,
}

impl std::fmt::Display for PlacedOrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}",
            self.store_type, self.store_id, self.store_order_id, self.trade_id
        )
    }
}

impl From<PlacedOrderKey> for StoreError {
    fn from(key: PlacedOrderKey) -> Self {
        StoreError::DuplicateTrade {
            store_type: key.store_type,
            store_id: key.store_id,
            store_order_id: key.store_order_id,
            trade_id: key.trade_id,
        }
    }
}

/// One sourced product inside a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrderItem {
    pub id: Uuid,

    /// The cart line this item fulfills.
    pub order_data_id: CartLineKey,

    /// Supplier product id.
    pub product_id: String,

    /// Supplier SKU id of the ordered variant.
    pub variant_id: String,

    pub title: String,
    pub quantity: u32,
    pub unit_cost: Decimal,

    /// True when the cart line is a bundle and this item is one of its members.
    pub is_bundle: bool,

    /// Tracking number reported by the supplier for this item.
    pub source_tracking: Option<String>,

    /// Storefront tracking record created for this item.
    pub order_track_id: Option<i64>,

    /// Comma-joined trade ids when the cart line was fulfilled by several trades.
    pub combined_trade_ids: Option<String>,
}

impl PlacedOrderItem {
    pub fn new(
        order_data_id: CartLineKey,
        product_id: impl Into<String>,
        variant_id: impl Into<String>,
        quantity: u32,
        unit_cost: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_data_id,
            product_id: product_id.into(),
            variant_id: variant_id.into(),
            title: String::new(),
            quantity,
            unit_cost,
            is_bundle: false,
            source_tracking: None,
            order_track_id: None,
            combined_trade_ids: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn bundled(mut self, is_bundle: bool) -> Self {
        self.is_bundle = is_bundle;
        self
    }

    /// `product_id:variant_id`, the key the duplicate-placement guard matches on.
    pub fn source_key(&self) -> String {
        format!("{}:{}", self.product_id, self.variant_id)
    }

    /// The supplier order id reported to the storefront for this item.
    pub fn fulfillment_source_id<'a>(&'a self, trade_id: &'a str) -> &'a str {
        self.combined_trade_ids.as_deref().unwrap_or(trade_id)
    }

    pub fn total_cost(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity)
    }
}

/// A supplier trade created for one storefront order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub id: PlacedOrderId,

    /// Supplier order id.
    pub trade_id: String,

    pub store_type: StoreType,
    pub store_id: i64,
    pub store_order_id: String,
    pub source_status: SourceStatus,
    pub products_cost: Decimal,
    pub shipping_cost: Decimal,
    pub currency: String,
    pub tracking_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<PlacedOrderItem>,
}

impl PlacedOrder {
    /// Creates a new placed order builder.
    pub fn builder() -> PlacedOrderBuilder {
        PlacedOrderBuilder::default()
    }

    pub fn store(&self) -> StoreRef {
        StoreRef::new(self.store_type, self.store_id)
    }

    pub fn key(&self) -> PlacedOrderKey {
        PlacedOrderKey {
            store_type: self.store_type,
            store_id: self.store_id,
            store_order_id: self.store_order_id.clone(),
            trade_id: self.trade_id.clone(),
        }
    }

    pub fn total_cost(&self) -> Decimal {
        self.products_cost + self.shipping_cost
    }

    /// Returns true if any item fulfills the given cart line.
    pub fn covers_line(&self, order_data_id: &CartLineKey) -> bool {
        self.items.iter().any(|i| &i.order_data_id == order_data_id)
    }

    /// Ids of the storefront tracking records referenced by this order's items.
    pub fn order_track_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.items.iter().filter_map(|i| i.order_track_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Builder for constructing placed orders.
#[derive(Debug, Default)]
pub struct PlacedOrderBuilder {
    id: Option<PlacedOrderId>,
    trade_id: Option<String>,
    store: Option<StoreRef>,
    store_order_id: Option<String>,
    source_status: SourceStatus,
    products_cost: Decimal,
    shipping_cost: Decimal,
    currency: Option<String>,
    tracking_url: Option<String>,
    created_at: Option<DateTime<Utc>>,
    items: Vec<PlacedOrderItem>,
}

impl PlacedOrderBuilder {
    /// Sets the id. If not set, a new id will be generated.
    pub fn id(mut self, id: PlacedOrderId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(trade_id.into());
        self
    }

    pub fn store(mut self, store: StoreRef) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store_order_id(mut self, store_order_id: impl Into<String>) -> Self {
        self.store_order_id = Some(store_order_id.into());
        self
    }

    pub fn source_status(mut self, status: SourceStatus) -> Self {
        self.source_status = status;
        self
    }

    pub fn products_cost(mut self, cost: Decimal) -> Self {
        self.products_cost = cost;
        self
    }

    pub fn shipping_cost(mut self, cost: Decimal) -> Self {
        self.shipping_cost = cost;
        self
    }

    /// Sets the currency. Defaults to `USD`.
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn tracking_url(mut self, url: impl Into<String>) -> Self {
        self.tracking_url = Some(url.into());
        self
    }

    /// Sets the creation time. If not set, the current time will be used.
    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn item(mut self, item: PlacedOrderItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = PlacedOrderItem>) -> Self {
        self.items.extend(items);
        self
    }

    /// Builds the placed order, failing if trade id, store or store order id is missing.
    pub fn build(self) -> Result<PlacedOrder, StoreError> {
        let missing = |field: &str| StoreError::InvalidBatch(format!("{field} is required"));

        let trade_id = self.trade_id.ok_or_else(|| missing("trade_id"))?;
        let store = self.store.ok_or_else(|| missing("store"))?;
        let store_order_id = self.store_order_id.ok_or_else(|| missing("store_order_id"))?;
        let created_at = self.created_at.unwrap_or_else(Utc::now);

        Ok(PlacedOrder {
            id: self.id.unwrap_or_default(),
            trade_id,
            store_type: store.store_type,
            store_id: store.store_id,
            store_order_id,
            source_status: self.source_status,
            products_cost: self.products_cost,
            shipping_cost: self.shipping_cost,
            currency: self.currency.unwrap_or_else(|| "USD".to_string()),
            tracking_url: self.tracking_url,
            created_at,
            updated_at: created_at,
            items: self.items,
        })
    }

    /// Tries to build the placed order, returning None if required fields are missing.
    pub fn try_build(self) -> Option<PlacedOrder> {
        self.build().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(line_id: &str) -> CartLineKey {
        CartLineKey::new(1, "1001", line_id)
    }

    #[test]
    fn placed_order_builder() {
        let order = PlacedOrder::builder()
            .trade_id("TR1")
            .store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_id("1001")
            .products_cost(Decimal::new(2000, 2))
            .shipping_cost(Decimal::new(350, 2))
            .item(PlacedOrderItem::new(line("5"), "P1", "S1", 2, Decimal::new(1000, 2)))
            .build()
            .unwrap();

        assert_eq!(order.trade_id, "TR1");
        assert_eq!(order.store(), StoreRef::new(StoreType::Shopify, 1));
        assert_eq!(order.source_status, SourceStatus::Unpay);
        assert_eq!(order.currency, "USD");
        assert_eq!(order.total_cost(), Decimal::new(2350, 2));
        assert_eq!(order.created_at, order.updated_at);
        assert!(order.covers_line(&line("5")));
        assert!(!order.covers_line(&line("6")));
    }

    #[test]
    fn placed_order_builder_requires_trade_id() {
        let result = PlacedOrder::builder()
            .store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_id("1001")
            .build();
        assert!(matches!(result, Err(StoreError::InvalidBatch(_))));
        assert!(PlacedOrder::builder().try_build().is_none());
    }

    #[test]
    fn item_source_key_and_fulfillment_id() {
        let mut item = PlacedOrderItem::new(line("5"), "P1", "S1", 3, Decimal::new(250, 2));
        assert_eq!(item.source_key(), "P1:S1");
        assert_eq!(item.total_cost(), Decimal::new(750, 2));
        assert_eq!(item.fulfillment_source_id("TR1"), "TR1");

        item.combined_trade_ids = Some("TR1,TR2".to_string());
        assert_eq!(item.fulfillment_source_id("TR1"), "TR1,TR2");
    }

    #[test]
    fn order_track_ids_are_deduplicated() {
        let mut a = PlacedOrderItem::new(line("5"), "P1", "S1", 1, Decimal::ONE);
        let mut b = PlacedOrderItem::new(line("6"), "P2", "S2", 1, Decimal::ONE);
        let c = PlacedOrderItem::new(line("7"), "P3", "S3", 1, Decimal::ONE);
        a.order_track_id = Some(9);
        b.order_track_id = Some(9);

        let order = PlacedOrder::builder()
            .trade_id("TR1")
            .store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_id("1001")
            .items([a, b, c])
            .build()
            .unwrap();

        assert_eq!(order.order_track_ids(), vec![9]);
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    PlacedOrder, PlacedOrderId, PlacedOrderQuery, Result, StoreError,
    store::{PlacedOrderStore, validate_batch},
};

/// In-memory placed order store implementation for testing.
///
/// This implementation keeps every order in memory and enforces the same
/// uniqueness and atomicity guarantees as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryPlacedOrderStore {
    orders: Arc<RwLock<Vec<PlacedOrder>>>,
}

impl InMemoryPlacedOrderStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of placed orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    /// Clears all orders.
    pub async fn clear(&self) {
        self.orders.write().await.clear();
    }
}

#[async_trait]
impl PlacedOrderStore for InMemoryPlacedOrderStore {
    async fn insert_batch(&self, orders: Vec<PlacedOrder>) -> Result<Vec<PlacedOrderId>> {
        validate_batch(&orders)?;

        let mut store = self.orders.write().await;

        // Check every key before writing anything so a conflict leaves the store untouched
        for order in &orders {
            let key = order.key();
            if store.iter().any(|existing| existing.key() == key) {
                metrics::counter!("order_store_duplicates_total").increment(1);
                return Err(key.into());
            }
        }

        let ids = orders.iter().map(|o| o.id).collect();
        metrics::counter!("order_store_inserts_total").increment(orders.len() as u64);
        store.extend(orders);

        Ok(ids)
    }

    async fn get(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>> {
        let store = self.orders.read().await;
        Ok(store.iter().find(|o| o.id == id).cloned())
    }

    async fn query(&self, query: PlacedOrderQuery) -> Result<Vec<PlacedOrder>> {
        let store = self.orders.read().await;
        let mut orders: Vec<_> = store
            .iter()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();

        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.trade_id.cmp(&b.trade_id))
        });

        let offset = query.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        let orders = match query.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        };

        Ok(orders)
    }

    async fn update(&self, order: &PlacedOrder) -> Result<()> {
        let mut store = self.orders.write().await;
        let existing = store
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or(StoreError::NotFound(order.id))?;

        existing.source_status = order.source_status;
        existing.products_cost = order.products_cost;
        existing.shipping_cost = order.shipping_cost;
        existing.tracking_url = order.tracking_url.clone();
        existing.items = order.items.clone();
        existing.updated_at = Utc::now();

        Ok(())
    }

    async fn delete(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>> {
        let mut store = self.orders.write().await;
        let position = store.iter().position(|o| o.id == id);
        Ok(position.map(|index| store.remove(index)))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{
        CartLineKey, PlacedOrderItem, PlacedOrderStoreExt, SourceStatus, StoreRef, StoreType,
    };

    fn create_test_order(store_order_id: &str, trade_id: &str) -> PlacedOrder {
        PlacedOrder::builder()
            .trade_id(trade_id)
            .store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_id(store_order_id)
            .products_cost(Decimal::new(1000, 2))
            .item(PlacedOrderItem::new(
                CartLineKey::new(1, store_order_id, "5"),
                "P1",
                "S1",
                1,
                Decimal::new(1000, 2),
            ))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn insert_single_order() {
        let store = InMemoryPlacedOrderStore::new();
        let order = create_test_order("1001", "TR1");
        let id = order.id;

        let result = store.insert(order).await;
        assert_eq!(result.unwrap(), id);

        let loaded = store.get(id).await.unwrap().unwrap();
        assert_eq!(loaded.trade_id, "TR1");
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn insert_batch_is_atomic_on_duplicate() {
        let store = InMemoryPlacedOrderStore::new();
        store
            .insert(create_test_order("1002", "TR2"))
            .await
            .unwrap();

        // Second of three conflicts with the existing row
        let batch = vec![
            create_test_order("1001", "TR1"),
            create_test_order("1002", "TR2"),
            create_test_order("1003", "TR3"),
        ];
        let result = store.insert_batch(batch).await;

        assert!(matches!(result, Err(StoreError::DuplicateTrade { .. })));
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn same_trade_for_different_store_orders_is_allowed() {
        let store = InMemoryPlacedOrderStore::new();
        let result = store
            .insert_batch(vec![
                create_test_order("1001", "TR1"),
                create_test_order("1002", "TR1"),
            ])
            .await;

        assert!(result.is_ok());
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn query_by_store_order_ids() {
        let store = InMemoryPlacedOrderStore::new();
        store
            .insert_batch(vec![
                create_test_order("1001", "TR1"),
                create_test_order("1002", "TR2"),
                create_test_order("1003", "TR3"),
            ])
            .await
            .unwrap();

        let query = PlacedOrderQuery::for_store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_ids(["1001", "1003"]);
        let results = store.query(query).await.unwrap();

        let trades: Vec<_> = results.iter().map(|o| o.trade_id.as_str()).collect();
        assert_eq!(trades, vec!["TR1", "TR3"]);
    }

    #[tokio::test]
    async fn query_with_limit_and_offset() {
        let store = InMemoryPlacedOrderStore::new();
        store
            .insert_batch(vec![
                create_test_order("1001", "TR1"),
                create_test_order("1002", "TR2"),
                create_test_order("1003", "TR3"),
            ])
            .await
            .unwrap();

        let results = store
            .query(PlacedOrderQuery::new().offset(1).limit(1))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_mutable_state() {
        let store = InMemoryPlacedOrderStore::new();
        let order = create_test_order("1001", "TR1");
        let id = order.id;
        store.insert(order).await.unwrap();

        let mut loaded = store.get_required(id).await.unwrap();
        loaded.source_status = SourceStatus::Delivering;
        loaded.tracking_url = Some("https://track.example/TN1".to_string());
        loaded.items[0].source_tracking = Some("TN1".to_string());
        store.update(&loaded).await.unwrap();

        let reloaded = store.get_required(id).await.unwrap();
        assert_eq!(reloaded.source_status, SourceStatus::Delivering);
        assert_eq!(reloaded.items[0].source_tracking.as_deref(), Some("TN1"));
        assert!(reloaded.updated_at >= reloaded.created_at);
    }

    #[tokio::test]
    async fn update_missing_order_fails() {
        let store = InMemoryPlacedOrderStore::new();
        let order = create_test_order("1001", "TR1");
        let result = store.update(&order).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_returns_removed_order() {
        let store = InMemoryPlacedOrderStore::new();
        let order = create_test_order("1001", "TR1");
        let id = order.id;
        store.insert(order).await.unwrap();

        let deleted = store.delete(id).await.unwrap();
        assert_eq!(deleted.map(|o| o.trade_id), Some("TR1".to_string()));
        assert!(store.get(id).await.unwrap().is_none());
        assert!(store.delete(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_trade() {
        let store = InMemoryPlacedOrderStore::new();
        store
            .insert(create_test_order("1001", "TR1"))
            .await
            .unwrap();

        let found = store.find_by_trade("TR1").await.unwrap();
        assert_eq!(found.map(|o| o.store_order_id), Some("1001".to_string()));
        assert!(store.find_by_trade("TR9").await.unwrap().is_none());
    }
}

use std::collections::HashSet;

use async_trait::async_trait;

use crate::{PlacedOrder, PlacedOrderId, PlacedOrderQuery, Result, StoreError};

/// Core trait for placed order storage.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PlacedOrderStore: Send + Sync {
    /// Inserts a batch of placed orders with their items.
    ///
    /// The batch is atomic - either every order persists or none does.
    /// If any order's `(store_type, store_id, store_order_id, trade_id)`
    /// already exists, or appears twice in the batch, the call fails with
    /// `DuplicateTrade` and nothing is written.
    async fn insert_batch(&self, orders: Vec<PlacedOrder>) -> Result<Vec<PlacedOrderId>>;

    /// Retrieves a placed order by id.
    async fn get(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>>;

    /// Retrieves placed orders matching a query, oldest first.
    async fn query(&self, query: PlacedOrderQuery) -> Result<Vec<PlacedOrder>>;

    /// Replaces the mutable state of a placed order (status, costs, tracking, items).
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn update(&self, order: &PlacedOrder) -> Result<()>;

    /// Deletes a placed order and its items, returning what was deleted.
    async fn delete(&self, id: PlacedOrderId) -> Result<Option<PlacedOrder>>;
}

/// Extension trait providing convenience methods for placed order stores.
#[async_trait]
pub trait PlacedOrderStoreExt: PlacedOrderStore {
    /// Inserts a single placed order.
    async fn insert(&self, order: PlacedOrder) -> Result<PlacedOrderId> {
        let order_id = order.id;
        self.insert_batch(vec![order]).await?;
        Ok(order_id)
    }

    /// Loads a placed order, failing with `NotFound` if it does not exist.
    async fn get_required(&self, id: PlacedOrderId) -> Result<PlacedOrder> {
        self.get(id).await?.ok_or(StoreError::NotFound(id))
    }

    /// Finds the placed order for a supplier trade id.
    async fn find_by_trade(&self, trade_id: &str) -> Result<Option<PlacedOrder>> {
        let mut orders = self
            .query(PlacedOrderQuery::for_trade(trade_id).limit(1))
            .await?;
        Ok(orders.pop())
    }
}

// Blanket implementation for all PlacedOrderStore implementations
impl<T: PlacedOrderStore + ?Sized> PlacedOrderStoreExt for T {}

/// Validates a batch before inserting.
///
/// Rejects empty batches, orders without items or trade id, and duplicate
/// keys inside the batch itself.
pub fn validate_batch(orders: &[PlacedOrder]) -> Result<()> {
    if orders.is_empty() {
        return Err(StoreError::InvalidBatch(
            "Cannot insert empty order list".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(orders.len());
    for order in orders {
        if order.trade_id.is_empty() {
            return Err(StoreError::InvalidBatch(format!(
                "Order {} has no trade id",
                order.store_order_id
            )));
        }
        if order.items.is_empty() {
            return Err(StoreError::InvalidBatch(format!(
                "Trade {} has no items",
                order.trade_id
            )));
        }
        if !seen.insert(order.key()) {
            return Err(order.key().into());
        }
    }

    Ok(())
}

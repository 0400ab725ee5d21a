use crate::{CartLineKey, PlacedOrder, SourceStatus, StoreRef};

/// Builder for constructing placed order queries.
///
/// Every filter that is set must match; list filters match when any of
/// their values matches.
#[derive(Debug, Clone, Default)]
pub struct PlacedOrderQuery {
    /// Filter by storefront.
    pub store: Option<StoreRef>,

    /// Filter by storefront order ids (any of these).
    pub store_order_ids: Option<Vec<String>>,

    /// Filter to orders with at least one item fulfilling one of these cart lines.
    pub order_data_ids: Option<Vec<CartLineKey>>,

    /// Filter by supplier trade id.
    pub trade_id: Option<String>,

    /// Filter by supplier status (any of these).
    pub statuses: Option<Vec<SourceStatus>>,

    /// Filter to orders with an item referencing one of these tracking records.
    pub order_track_ids: Option<Vec<i64>>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl PlacedOrderQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for the orders of one store.
    pub fn for_store(store: StoreRef) -> Self {
        Self {
            store: Some(store),
            ..Default::default()
        }
    }

    /// Creates a query for one supplier trade.
    pub fn for_trade(trade_id: impl Into<String>) -> Self {
        Self {
            trade_id: Some(trade_id.into()),
            ..Default::default()
        }
    }

    pub fn store(mut self, store: StoreRef) -> Self {
        self.store = Some(store);
        self
    }

    pub fn store_order_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.store_order_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn order_data_ids(mut self, ids: impl IntoIterator<Item = CartLineKey>) -> Self {
        self.order_data_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn trade_id(mut self, trade_id: impl Into<String>) -> Self {
        self.trade_id = Some(trade_id.into());
        self
    }

    pub fn statuses(mut self, statuses: Vec<SourceStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Filters to orders whose status is not terminal.
    pub fn open(self) -> Self {
        self.statuses(vec![
            SourceStatus::Unpay,
            SourceStatus::Paying,
            SourceStatus::Undeliver,
            SourceStatus::Delivering,
            SourceStatus::WaitConfirmReceipt,
        ])
    }

    pub fn order_track_ids(mut self, ids: Vec<i64>) -> Self {
        self.order_track_ids = Some(ids);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the order satisfies every filter (ignores limit/offset).
    pub fn matches(&self, order: &PlacedOrder) -> bool {
        if let Some(store) = self.store
            && order.store() != store
        {
            return false;
        }
        if let Some(ref ids) = self.store_order_ids
            && !ids.contains(&order.store_order_id)
        {
            return false;
        }
        if let Some(ref lines) = self.order_data_ids
            && !lines.iter().any(|line| order.covers_line(line))
        {
            return false;
        }
        if let Some(ref trade_id) = self.trade_id
            && &order.trade_id != trade_id
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&order.source_status)
        {
            return false;
        }
        if let Some(ref track_ids) = self.order_track_ids
            && !order
                .items
                .iter()
                .any(|i| i.order_track_id.is_some_and(|id| track_ids.contains(&id)))
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::{PlacedOrderItem, StoreType};

    fn order(store_order_id: &str, trade_id: &str, line: &str) -> PlacedOrder {
        PlacedOrder::builder()
            .trade_id(trade_id)
            .store(StoreRef::new(StoreType::Shopify, 1))
            .store_order_id(store_order_id)
            .item(PlacedOrderItem::new(
                CartLineKey::new(1, store_order_id, line),
                "P1",
                "S1",
                1,
                Decimal::ONE,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn query_for_store() {
        let store = StoreRef::new(StoreType::Shopify, 1);
        let query = PlacedOrderQuery::for_store(store);

        assert_eq!(query.store, Some(store));
        assert!(query.trade_id.is_none());
        assert!(query.matches(&order("1001", "TR1", "5")));
        assert!(!PlacedOrderQuery::for_store(StoreRef::new(StoreType::Ebay, 1))
            .matches(&order("1001", "TR1", "5")));
    }

    #[test]
    fn query_builder_chain() {
        let query = PlacedOrderQuery::new()
            .store_order_ids(["1001", "1002"])
            .trade_id("TR1")
            .limit(10)
            .offset(0);

        assert_eq!(
            query.store_order_ids,
            Some(vec!["1001".to_string(), "1002".to_string()])
        );
        assert_eq!(query.trade_id, Some("TR1".to_string()));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(0));
    }

    #[test]
    fn query_matches_overlapping_cart_lines() {
        let placed = order("1001", "TR1", "5");

        let hit = PlacedOrderQuery::new().order_data_ids([
            CartLineKey::new(1, "1001", "9"),
            CartLineKey::new(1, "1001", "5"),
        ]);
        let miss = PlacedOrderQuery::new().order_data_ids([CartLineKey::new(1, "1001", "9")]);

        assert!(hit.matches(&placed));
        assert!(!miss.matches(&placed));
    }

    #[test]
    fn open_query_excludes_terminal_orders() {
        let mut placed = order("1001", "TR1", "5");
        let query = PlacedOrderQuery::new().open();
        assert!(query.matches(&placed));

        placed.source_status = SourceStatus::TradeSuccess;
        assert!(!query.matches(&placed));
    }
}

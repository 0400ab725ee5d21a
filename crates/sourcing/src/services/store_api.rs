//! Storefront tracking API trait and in-memory implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::StoreRef;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, SourcingError};

/// Links one storefront line item to a supplier order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillRequest {
    pub store: StoreRef,
    pub order_id: String,
    pub line_id: String,

    /// Supplier order id, comma-joined when several trades fulfill the line.
    pub source_order_id: String,

    pub source_type: String,
}

/// Pushes the current supplier state of a tracking record to the storefront.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FulfillUpdate {
    pub store: StoreRef,
    pub order_track_id: i64,
    pub status: String,
    pub order_details: Value,
    pub tracking_number: Option<String>,
    pub source_id: String,
    pub source_type: String,
    pub bundle: bool,
}

/// Per-storefront API maintaining tracking records.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Creates a tracking record and returns its id.
    async fn post_order_fulfill(&self, request: FulfillRequest) -> Result<i64>;

    async fn post_order_fulfill_update(&self, update: FulfillUpdate) -> Result<()>;

    async fn delete_order_track(&self, store: StoreRef, order_track_id: i64) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryStoreApiState {
    tracks: BTreeMap<i64, FulfillRequest>,
    updates: Vec<FulfillUpdate>,
    next_id: i64,
    fail_on_fulfill: bool,
    fail_on_update: bool,
}

/// In-memory storefront API for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoreApi {
    state: Arc<Mutex<InMemoryStoreApiState>>,
}

impl InMemoryStoreApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryStoreApiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_fail_on_fulfill(&self, fail: bool) {
        self.state().fail_on_fulfill = fail;
    }

    pub fn set_fail_on_update(&self, fail: bool) {
        self.state().fail_on_update = fail;
    }

    /// Returns the tracking records that currently exist.
    pub fn tracks(&self) -> Vec<(i64, FulfillRequest)> {
        self.state()
            .tracks
            .iter()
            .map(|(id, request)| (*id, request.clone()))
            .collect()
    }

    /// Returns every update that was accepted.
    pub fn updates(&self) -> Vec<FulfillUpdate> {
        self.state().updates.clone()
    }
}

#[async_trait]
impl StoreApi for InMemoryStoreApi {
    async fn post_order_fulfill(&self, request: FulfillRequest) -> Result<i64> {
        let mut state = self.state();
        if state.fail_on_fulfill {
            return Err(SourcingError::StoreApi("Store unavailable".to_string()));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.tracks.insert(id, request);
        Ok(id)
    }

    async fn post_order_fulfill_update(&self, update: FulfillUpdate) -> Result<()> {
        let mut state = self.state();
        if state.fail_on_update {
            return Err(SourcingError::StoreApi("Store unavailable".to_string()));
        }
        state.updates.push(update);
        Ok(())
    }

    async fn delete_order_track(&self, _store: StoreRef, order_track_id: i64) -> Result<()> {
        self.state().tracks.remove(&order_track_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use common::StoreType;

    use super::*;

    fn request(line_id: &str) -> FulfillRequest {
        FulfillRequest {
            store: StoreRef::new(StoreType::Shopify, 1),
            order_id: "1001".to_string(),
            line_id: line_id.to_string(),
            source_order_id: "TR-0001".to_string(),
            source_type: "alibaba".to_string(),
        }
    }

    #[tokio::test]
    async fn fulfill_and_delete_tracks() {
        let api = InMemoryStoreApi::new();
        let first = api.post_order_fulfill(request("5")).await.unwrap();
        let second = api.post_order_fulfill(request("6")).await.unwrap();
        assert_eq!((first, second), (1, 2));

        api.delete_order_track(StoreRef::new(StoreType::Shopify, 1), first)
            .await
            .unwrap();
        let remaining: Vec<_> = api.tracks().into_iter().map(|(id, _)| id).collect();
        assert_eq!(remaining, vec![2]);
    }

    #[tokio::test]
    async fn failure_toggles() {
        let api = InMemoryStoreApi::new();
        api.set_fail_on_fulfill(true);
        assert!(api.post_order_fulfill(request("5")).await.is_err());
        assert!(api.tracks().is_empty());
    }
}

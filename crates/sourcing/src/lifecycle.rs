//! Reconciliation of placed orders with the supplier.

use common::{PlacedOrderId, SourceStatus, StoreRef};
use domain::{StatusMapping, TradeDetails};
use order_store::{PlacedOrder, PlacedOrderQuery, PlacedOrderStore, PlacedOrderStoreExt};
use serde::Serialize;
use serde_json::json;

use crate::{
    config::SourcingConfig,
    error::{Result, SourcingError},
    services::{FulfillUpdate, StoreApi, SupplierClient, check_response, resources},
};

/// What a reload did to the local record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReloadOutcome {
    Unchanged { status: SourceStatus },
    Transitioned { from: SourceStatus, to: SourceStatus },

    /// The supplier reported a status outside the lookup table; the
    /// local state was left as it was.
    Unrecognized { status: String },
}

/// Result of reconciling one placed order in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledOrder {
    pub placed_order_id: PlacedOrderId,
    pub trade_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ReloadOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A removed placed order and the tracking records deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemovedTracking {
    pub order: PlacedOrder,
    pub deleted_track_ids: Vec<i64>,
}

/// Moves placed orders through their supplier-side states.
///
/// The local record is authoritative. Storefront tracking updates that fail
/// are logged and picked up again by the next reconciliation.
pub struct OrderLifecycle<S, C, A>
where
    S: PlacedOrderStore,
    C: SupplierClient,
    A: StoreApi,
{
    store: S,
    supplier: C,
    store_api: A,
    config: SourcingConfig,
}

impl<S, C, A> OrderLifecycle<S, C, A>
where
    S: PlacedOrderStore,
    C: SupplierClient,
    A: StoreApi,
{
    pub fn new(store: S, supplier: C, store_api: A, config: SourcingConfig) -> Self {
        Self {
            store,
            supplier,
            store_api,
            config,
        }
    }

    /// Fetches the trade from the supplier and applies its status.
    #[tracing::instrument(skip(self))]
    pub async fn reload_details(&self, id: PlacedOrderId) -> Result<ReloadOutcome> {
        let mut order = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SourcingError::PlacedOrderNotFound(id.to_string()))?;

        let response = self
            .supplier
            .post(resources::ORDER_GET, json!({ "e_trade_id": order.trade_id }))
            .await
            .and_then(check_response)?;
        let details = TradeDetails::from_response(&response)?;

        let status = match details.status() {
            StatusMapping::Mapped(status) => status,
            StatusMapping::Unrecognized(status) => {
                tracing::warn!(trade_id = %order.trade_id, status = %status, "Unrecognized trade status");
                return Ok(ReloadOutcome::Unrecognized { status });
            }
        };

        let previous = order.source_status;
        let tracking_changed = apply_tracking(&mut order, &details, status);
        if status == previous {
            if tracking_changed {
                self.store.update(&order).await?;
            }
            return Ok(ReloadOutcome::Unchanged { status });
        }

        order.source_status = status;
        self.store.update(&order).await?;
        metrics::counter!("sourcing_status_transitions_total", "status" => status.as_str())
            .increment(1);
        tracing::info!(trade_id = %order.trade_id, from = %previous.as_str(), to = %status.as_str(), "Trade status changed");

        self.push_tracking(&order).await;

        Ok(ReloadOutcome::Transitioned {
            from: previous,
            to: status,
        })
    }

    /// Reloads the placed order of a trade the supplier notified about.
    #[tracing::instrument(skip(self))]
    pub async fn handle_trade_notification(&self, trade_id: &str) -> Result<ReloadOutcome> {
        let order = self
            .store
            .find_by_trade(trade_id)
            .await?
            .ok_or_else(|| SourcingError::PlacedOrderNotFound(trade_id.to_string()))?;
        self.reload_details(order.id).await
    }

    /// Reloads every non-terminal placed order of a store.
    ///
    /// A failing order is reported in its entry and does not stop the rest.
    #[tracing::instrument(skip(self), fields(store = %store))]
    pub async fn reconcile_open(&self, store: StoreRef) -> Result<Vec<ReconciledOrder>> {
        let orders = self
            .store
            .query(PlacedOrderQuery::for_store(store).open())
            .await?;

        let mut results = Vec::with_capacity(orders.len());
        for order in orders {
            let (outcome, error) = match self.reload_details(order.id).await {
                Ok(outcome) => (Some(outcome), None),
                Err(e) => {
                    tracing::warn!(error = %e, trade_id = %order.trade_id, "Reconciliation failed");
                    (None, Some(e.to_string()))
                }
            };
            results.push(ReconciledOrder {
                placed_order_id: order.id,
                trade_id: order.trade_id,
                outcome,
                error,
            });
        }

        tracing::info!(orders = results.len(), "Open orders reconciled");
        Ok(results)
    }

    /// Deletes a placed order and the storefront tracking records that no
    /// other placed item refers to.
    #[tracing::instrument(skip(self))]
    pub async fn remove_tracking(&self, id: PlacedOrderId) -> Result<RemovedTracking> {
        let order = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| SourcingError::PlacedOrderNotFound(id.to_string()))?;

        let track_ids = order.order_track_ids();
        let mut deleted_track_ids = Vec::new();
        if !track_ids.is_empty() {
            let still_used: Vec<i64> = self
                .store
                .query(PlacedOrderQuery::for_store(order.store()).order_track_ids(track_ids.clone()))
                .await?
                .iter()
                .flat_map(PlacedOrder::order_track_ids)
                .collect();

            for track_id in track_ids.into_iter().filter(|t| !still_used.contains(t)) {
                match self.store_api.delete_order_track(order.store(), track_id).await {
                    Ok(()) => deleted_track_ids.push(track_id),
                    Err(e) => {
                        tracing::warn!(error = %e, order_track_id = track_id, "Failed to delete order tracking");
                    }
                }
            }
        }

        tracing::info!(trade_id = %order.trade_id, deleted = deleted_track_ids.len(), "Placed order removed");
        Ok(RemovedTracking {
            order,
            deleted_track_ids,
        })
    }

    /// Sends the current state of each tracking record of an order to the storefront.
    async fn push_tracking(&self, order: &PlacedOrder) {
        let order_details = match serde_json::to_value(order) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize placed order");
                return;
            }
        };

        let mut sent: Vec<i64> = Vec::new();
        for item in &order.items {
            let Some(order_track_id) = item.order_track_id else {
                continue;
            };
            if sent.contains(&order_track_id) {
                continue;
            }
            sent.push(order_track_id);

            let update = FulfillUpdate {
                store: order.store(),
                order_track_id,
                status: order.source_status.as_str().to_string(),
                order_details: order_details.clone(),
                tracking_number: item.source_tracking.clone(),
                source_id: item.fulfillment_source_id(&order.trade_id).to_string(),
                source_type: self.config.source_type.clone(),
                bundle: item.is_bundle,
            };
            if let Err(e) = self.store_api.post_order_fulfill_update(update).await {
                tracing::warn!(error = %e, order_track_id, "Failed to update order tracking");
            }
        }
    }
}

/// Copies shipment information onto a paid order. Returns true when
/// anything changed.
fn apply_tracking(order: &mut PlacedOrder, details: &TradeDetails, status: SourceStatus) -> bool {
    if !status.is_paid() {
        return false;
    }

    let mut changed = false;
    if let Some(url) = details.tracking_url()
        && order.tracking_url.as_deref() != Some(url)
    {
        order.tracking_url = Some(url.to_string());
        changed = true;
    }

    if let Some(fee) = details.shipping_fee
        && order.shipping_cost != fee.amount()
    {
        order.shipping_cost = fee.amount();
        changed = true;
    }

    for item in &mut order.items {
        let tracking = details
            .shipment_for(&item.product_id)
            .map(|s| s.tracking_number.clone());
        if tracking.is_some() && item.source_tracking != tracking {
            item.source_tracking = tracking;
            changed = true;
        }
    }

    changed
}

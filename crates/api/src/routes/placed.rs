//! Placed order endpoints: inspection, reconciliation and tracking removal.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{PlacedOrderId, StoreRef, StoreType};
use order_store::{PlacedOrder, PlacedOrderStore};
use sourcing::{ReconciledOrder, ReloadOutcome, RemovedTracking};

use crate::AppState;
use crate::error::ApiError;

fn parse_placed_order_id(id: &str) -> Result<PlacedOrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(PlacedOrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid placed order id: {e}")))
}

/// GET /placed-orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PlacedOrder>, ApiError> {
    let placed_order_id = parse_placed_order_id(&id)?;
    let order = state
        .store
        .get(placed_order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Placed order {id} not found")))?;

    Ok(Json(order))
}

/// POST /placed-orders/{id}/sync: reload the trade from the supplier.
#[tracing::instrument(skip(state))]
pub async fn sync<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReloadOutcome>, ApiError> {
    let placed_order_id = parse_placed_order_id(&id)?;
    let outcome = state.lifecycle.reload_details(placed_order_id).await?;
    Ok(Json(outcome))
}

/// DELETE /placed-orders/{id}: remove the order and its orphaned tracking.
#[tracing::instrument(skip(state))]
pub async fn remove<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RemovedTracking>, ApiError> {
    let placed_order_id = parse_placed_order_id(&id)?;
    let removed = state.lifecycle.remove_tracking(placed_order_id).await?;
    Ok(Json(removed))
}

/// POST /webhooks/trades/{trade_id}: supplier change notification.
#[tracing::instrument(skip(state))]
pub async fn trade_webhook<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(trade_id): Path<String>,
) -> Result<Json<ReloadOutcome>, ApiError> {
    let outcome = state.lifecycle.handle_trade_notification(&trade_id).await?;
    Ok(Json(outcome))
}

/// POST /stores/{store_type}/{store_id}/reconcile: reload every open order
/// of a store.
#[tracing::instrument(skip(state))]
pub async fn reconcile<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path((store_type, store_id)): Path<(String, i64)>,
) -> Result<Json<Vec<ReconciledOrder>>, ApiError> {
    let store_type = StoreType::parse(&store_type)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown store type: {store_type}")))?;
    let results = state
        .lifecycle
        .reconcile_open(StoreRef::new(store_type, store_id))
        .await?;
    Ok(Json(results))
}

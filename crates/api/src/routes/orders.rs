//! Batch assembly endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use order_store::PlacedOrderStore;
use sourcing::{AssembleOutcome, AssembleRequest};

use crate::AppState;
use crate::error::ApiError;

/// POST /orders/assemble: resolve a batch of cart lines into supplier
/// orders and place them, unless the request is `validate_only`.
///
/// Responds `201 Created` when at least one order was placed.
#[tracing::instrument(
    skip(state, request),
    fields(store = %request.store, lines = request.cart_line_ids.len(), validate_only = request.validate_only)
)]
pub async fn assemble<S: PlacedOrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<AssembleRequest>,
) -> Result<(StatusCode, Json<AssembleOutcome>), ApiError> {
    if request.cart_line_ids.is_empty() {
        return Err(ApiError::BadRequest("cart_line_ids must not be empty".to_string()));
    }

    let outcome = state.assembler.process(&request).await?;
    let status = if outcome.placed_order_ids.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(outcome)))
}

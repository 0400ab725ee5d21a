//! HTTP API server with observability for the order-placement engine.
//!
//! Exposes batch assembly, placed order reconciliation and tracking
//! removal as REST endpoints, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::PlacedOrderStore;
use sourcing::{
    InMemoryCartSource, InMemoryStoreApi, InMemorySupplierClient, OrderAssembler, OrderLifecycle,
    SourcingConfig,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
///
/// The collaborator handles share state with the engine, so seeding the
/// supplier or cart through them is visible to every request.
pub struct AppState<S: PlacedOrderStore> {
    pub assembler: OrderAssembler<S, InMemorySupplierClient, InMemoryCartSource, InMemoryStoreApi>,
    pub lifecycle: OrderLifecycle<S, InMemorySupplierClient, InMemoryStoreApi>,
    pub store: S,
    pub supplier: InMemorySupplierClient,
    pub carts: InMemoryCartSource,
    pub store_api: InMemoryStoreApi,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: PlacedOrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/assemble", post(routes::orders::assemble::<S>))
        .route(
            "/placed-orders/{id}",
            get(routes::placed::get::<S>).delete(routes::placed::remove::<S>),
        )
        .route("/placed-orders/{id}/sync", post(routes::placed::sync::<S>))
        .route(
            "/stores/{store_type}/{store_id}/reconcile",
            post(routes::placed::reconcile::<S>),
        )
        .route("/webhooks/trades/{trade_id}", post(routes::placed::trade_webhook::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over a placed order store, with
/// in-memory supplier, cart and storefront collaborators.
pub fn create_default_state<S: PlacedOrderStore + Clone + 'static>(
    store: S,
    config: SourcingConfig,
) -> Arc<AppState<S>> {
    let supplier = InMemorySupplierClient::new();
    let carts = InMemoryCartSource::new();
    let store_api = InMemoryStoreApi::new();

    let assembler = OrderAssembler::new(
        store.clone(),
        supplier.clone(),
        carts.clone(),
        store_api.clone(),
        config.clone(),
    );
    let lifecycle = OrderLifecycle::new(store.clone(), supplier.clone(), store_api.clone(), config);

    Arc::new(AppState {
        assembler,
        lifecycle,
        store,
        supplier,
        carts,
        store_api,
    })
}

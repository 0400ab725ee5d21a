//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use common::CartLineKey;
use domain::{CartLineSnapshot, CartVariant, Money, ShippingAddress, SourcedProduct};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::InMemoryPlacedOrderStore;
use serde_json::{Value, json};
use sourcing::SourcingConfig;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup_with_state() -> (axum::Router, Arc<AppState<InMemoryPlacedOrderStore>>) {
    let state = api::create_default_state(InMemoryPlacedOrderStore::new(), SourcingConfig::default());
    let app = api::create_app(state.clone(), get_metrics_handle());

    state.supplier.add_product(json!({
        "product_id": "P1",
        "subject": "Widget",
        "supplier": {"company_id": "C1", "company_name": "Acme"},
        "min_order_quantity": 1,
        "ladder_price": [{"min_quantity": 1, "max_quantity": -1, "price": "10.00"}],
        "processing_time": [{"min_quantity": 1, "max_quantity": -1, "days": 3}],
        "sku_attributes": [{"attribute_id": 14, "attribute_name": "Color", "values": [
            {"id": 1, "name": "Red"}
        ]}],
        "skus": [{"sku_id": "P1-R", "attributes": ["14:1"], "price": "10.00"}]
    }));
    state.supplier.set_freight(
        "C1",
        vec![json!({"vendor_code": "EMS", "vendor_name": "EMS", "fee": {"amount": "3.00", "currency": "USD"}})],
    );
    state.carts.insert(
        CartLineSnapshot::simple(
            CartLineKey::new(1, "1001", "5"),
            SourcedProduct::new("P1", 1).with_variant(CartVariant::from_title("Red")),
            2,
            Money::from_cents(2000),
        )
        .with_address(ShippingAddress::new("US", "10001")),
    );

    (app, state)
}

fn setup() -> axum::Router {
    setup_with_state().0
}

fn assemble_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/orders/assemble")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn batch(lines: &[&str]) -> Value {
    json!({
        "store": {"store_type": "shopify", "store_id": 1},
        "cart_line_ids": lines,
    })
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn send(app: axum::Router, method: &str, uri: impl AsRef<str>) -> Response {
    app.oneshot(
        Request::builder()
            .method(method)
            .uri(uri.as_ref())
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn place_batch(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(assemble_request(batch(&["1_1001_5"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    json["placed_order_ids"][0].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();

    let response = send(app, "GET", "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();

    let response = send(app, "GET", "/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_validate_only_returns_orders_without_placing() {
    let (app, state) = setup_with_state();
    let mut body = batch(&["1_1001_5"]);
    body["validate_only"] = json!(true);

    let response = app.oneshot(assemble_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["orders"].as_array().unwrap().len(), 1);
    assert_eq!(json["orders"][0]["status"], "ready");
    assert_eq!(json["orders"][0]["items"][0]["order_data_id"], "1_1001_5");
    assert!(json["placed_order_ids"].as_array().unwrap().is_empty());
    assert!(state.supplier.created_orders().is_empty());
}

#[tokio::test]
async fn test_assemble_places_orders() {
    let (app, state) = setup_with_state();

    let response = app.oneshot(assemble_request(batch(&["1_1001_5"]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["orders"][0]["status"], "placed");
    assert_eq!(json["orders"][0]["trade_id"], "TR-0001");
    assert_eq!(json["placed_order_ids"].as_array().unwrap().len(), 1);
    assert_eq!(state.store.order_count().await, 1);
    assert_eq!(state.store_api.tracks().len(), 1);
}

#[tokio::test]
async fn test_unknown_cart_line_is_conflict() {
    let app = setup();

    let response = app
        .oneshot(assemble_request(batch(&["1_1001_5", "1_1001_9"])))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("1_1001_9"));
}

#[tokio::test]
async fn test_empty_batch_is_bad_request() {
    let app = setup();

    let response = app.oneshot(assemble_request(batch(&[]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_supplier_failure_aborts_batch() {
    let (app, state) = setup_with_state();
    state.supplier.set_fail_on_create(Some("ApiCallLimit: call limit exceeded"));

    let response = app.oneshot(assemble_request(batch(&["1_1001_5"]))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(state.store.order_count().await, 0);
}

#[tokio::test]
async fn test_get_placed_order() {
    let (app, _) = setup_with_state();
    let id = place_batch(&app).await;

    let response = send(app, "GET", format!("/placed-orders/{id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["trade_id"], "TR-0001");
    assert_eq!(json["store_order_id"], "1001");
    assert_eq!(json["source_status"], "unpay");
}

#[tokio::test]
async fn test_get_placed_order_not_found() {
    let app = setup();
    let id = uuid::Uuid::new_v4();

    let response = send(app, "GET", format!("/placed-orders/{id}")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_placed_order_id() {
    let app = setup();

    let response = send(app, "GET", "/placed-orders/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_applies_supplier_status() {
    let (app, state) = setup_with_state();
    let id = place_batch(&app).await;
    state.supplier.set_trade("TR-0001", json!({"trade_status": "pay_success"}));

    let response = send(app, "POST", format!("/placed-orders/{id}/sync")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "transitioned");
    assert_eq!(json["from"], "unpay");
    assert_eq!(json["to"], "undeliver");
}

#[tokio::test]
async fn test_trade_webhook() {
    let (app, _) = setup_with_state();
    place_batch(&app).await;

    let response = send(app.clone(), "POST", "/webhooks/trades/TR-0001").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["outcome"], "unchanged");

    let response = send(app, "POST", "/webhooks/trades/TR-9999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_store() {
    let (app, _) = setup_with_state();
    place_batch(&app).await;

    let response = send(app.clone(), "POST", "/stores/shopify/1/reconcile").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["trade_id"], "TR-0001");

    let response = send(app, "POST", "/stores/magento/1/reconcile").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_placed_order_removes_tracking() {
    let (app, state) = setup_with_state();
    let id = place_batch(&app).await;

    let response = send(app.clone(), "DELETE", format!("/placed-orders/{id}")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["deleted_track_ids"], json!([1]));
    assert!(state.store_api.tracks().is_empty());

    let response = send(app, "GET", format!("/placed-orders/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

//! Supplier API client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use domain::normalize::json_id;
use serde_json::{Value, json};

use crate::error::{Result, SourcingError};

/// Supplier API resources used by the engine.
pub mod resources {
    pub const PRODUCT_BATCH_GET: &str = "alibaba.dropshipping.product.batch.get";
    pub const FREIGHT_CALCULATE: &str = "alibaba.shipping.freight.calculate";
    pub const ORDER_CREATE: &str = "alibaba.buynow.order.create";
    pub const ORDER_GET: &str = "alibaba.seller.order.get";
}

/// Authenticated, rate-limited access to the supplier API.
///
/// Implementations return the supplier response, or `{"error": message}`
/// when the supplier rejected the call. `Err` is reserved for conditions
/// the client itself could not handle.
#[async_trait]
pub trait SupplierClient: Send + Sync {
    async fn post(&self, resource: &str, params: Value) -> Result<Value>;
}

/// Turns an `{"error": ...}` response into a classified supplier error.
pub fn check_response(response: Value) -> Result<Value> {
    match response.get("error") {
        Some(Value::String(message)) => Err(SourcingError::supplier(message.clone())),
        Some(Value::Null) | None => Ok(response),
        Some(other) => Err(SourcingError::supplier(other.to_string())),
    }
}

#[derive(Debug, Default)]
struct InMemorySupplierState {
    products: HashMap<String, Value>,
    freight: HashMap<String, Vec<Value>>,
    trades: HashMap<String, Value>,
    product_failures: HashMap<String, String>,
    freight_failures: HashMap<String, String>,
    fail_on_create: Option<String>,
    fail_create_after: Option<usize>,
    omit_trade_id: bool,
    created_orders: Vec<Value>,
    calls: Vec<(String, Value)>,
    next_trade: u32,
}

/// In-memory supplier for testing.
///
/// Serves registered raw products, freight quotes and trades, creates
/// trades with sequential ids (`TR-0001`, ...) and records every call.
#[derive(Debug, Clone, Default)]
pub struct InMemorySupplierClient {
    state: Arc<Mutex<InMemorySupplierState>>,
}

impl InMemorySupplierClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemorySupplierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a raw product payload, keyed by its `product_id`.
    pub fn add_product(&self, raw: Value) {
        if let Some(id) = raw.get("product_id").and_then(json_id) {
            self.state().products.insert(id, raw);
        }
    }

    pub fn remove_product(&self, product_id: &str) {
        self.state().products.remove(product_id);
    }

    /// Sets the freight options a supplier company quotes.
    pub fn set_freight(&self, company_id: &str, options: Vec<Value>) {
        self.state().freight.insert(company_id.to_string(), options);
    }

    /// Sets the `value` payload returned for a trade.
    pub fn set_trade(&self, trade_id: &str, details: Value) {
        self.state().trades.insert(trade_id.to_string(), details);
    }

    /// Fails any product batch containing `product_id` with `message`.
    pub fn fail_product(&self, product_id: &str, message: &str) {
        self.state()
            .product_failures
            .insert(product_id.to_string(), message.to_string());
    }

    /// Fails freight quotes for a supplier company with `message`.
    pub fn fail_freight(&self, company_id: &str, message: &str) {
        self.state()
            .freight_failures
            .insert(company_id.to_string(), message.to_string());
    }

    /// Configures every order creation to fail with `message`.
    pub fn set_fail_on_create(&self, message: Option<&str>) {
        self.state().fail_on_create = message.map(str::to_string);
    }

    /// Lets `count` order creations succeed, then fails the rest.
    pub fn set_fail_on_create_after(&self, count: Option<usize>) {
        self.state().fail_create_after = count;
    }

    /// Makes order creation answer without a trade id.
    pub fn set_omit_trade_id(&self, omit: bool) {
        self.state().omit_trade_id = omit;
    }

    /// Returns the `param_order_create_request` of every created order.
    pub fn created_orders(&self) -> Vec<Value> {
        self.state().created_orders.clone()
    }

    /// Returns how many times a resource was called.
    pub fn call_count(&self, resource: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|(r, _)| r == resource)
            .count()
    }

    fn product_batch(state: &InMemorySupplierState, params: &Value) -> Value {
        let ids: Vec<&str> = params
            .get("product_ids")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .split(',')
            .filter(|id| !id.is_empty())
            .collect();

        if let Some(message) = ids.iter().find_map(|id| state.product_failures.get(*id)) {
            return json!({ "error": message });
        }

        let products: Vec<Value> = ids
            .iter()
            .filter_map(|id| state.products.get(*id).cloned())
            .collect();
        json!({ "products": products })
    }

    fn freight(state: &InMemorySupplierState, params: &Value) -> Value {
        let company_id = params
            .get("company_id")
            .and_then(json_id)
            .unwrap_or_default();

        if let Some(message) = state.freight_failures.get(&company_id) {
            return json!({ "error": message });
        }

        let values = state.freight.get(&company_id).cloned().unwrap_or_default();
        json!({ "values": values })
    }

    fn create_order(state: &mut InMemorySupplierState, params: &Value) -> Value {
        if let Some(ref message) = state.fail_on_create {
            return json!({ "error": message });
        }
        if state
            .fail_create_after
            .is_some_and(|limit| state.created_orders.len() >= limit)
        {
            return json!({ "error": "Order creation failed" });
        }

        let request = params
            .get("param_order_create_request")
            .cloned()
            .unwrap_or(Value::Null);
        state.created_orders.push(request);

        if state.omit_trade_id {
            return json!({ "value": {} });
        }

        state.next_trade += 1;
        let trade_id = format!("TR-{:04}", state.next_trade);
        state
            .trades
            .insert(trade_id.clone(), json!({ "trade_status": "unpay", "logistics_orders": [] }));
        json!({ "value": { "trade_id": trade_id } })
    }

    fn get_order(state: &InMemorySupplierState, params: &Value) -> Value {
        let trade_id = params
            .get("e_trade_id")
            .and_then(json_id)
            .unwrap_or_default();

        match state.trades.get(&trade_id) {
            Some(details) => json!({ "value": details }),
            None => json!({ "error": format!("Trade {trade_id} not found") }),
        }
    }
}

#[async_trait]
impl SupplierClient for InMemorySupplierClient {
    async fn post(&self, resource: &str, params: Value) -> Result<Value> {
        let mut state = self.state();
        state.calls.push((resource.to_string(), params.clone()));

        let response = match resource {
            resources::PRODUCT_BATCH_GET => Self::product_batch(&state, &params),
            resources::FREIGHT_CALCULATE => Self::freight(&state, &params),
            resources::ORDER_CREATE => Self::create_order(&mut state, &params),
            resources::ORDER_GET => Self::get_order(&state, &params),
            other => json!({ "error": format!("Unknown resource {other}") }),
        };

        Ok(response)
    }
}

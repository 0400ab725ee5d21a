//! Phase B: placing supplier orders and persisting them.

use std::collections::HashMap;

use common::{CartLineKey, SourceStatus, StoreRef};
use domain::{AssembledOrder, AssemblyStatus, Money};
use order_store::{PlacedOrder, PlacedOrderStore, StoreError};
use serde_json::{Value, json};

use super::{AssembleOutcome, OrderAssembler};
use crate::{
    error::{Result, SourcingError},
    services::{CartSource, FulfillRequest, StoreApi, SupplierClient, check_response, resources},
};

/// Supplier order-create parameters for an assembled order.
///
/// The total is the sum of the listed unit prices times quantity, plus
/// the shipping fee, so it always matches the product list.
pub(super) fn order_payload(store: StoreRef, order: &AssembledOrder) -> Value {
    let mut total = order.shipping_fee().rounded();
    let product_list: Vec<Value> = order
        .ok_items()
        .map(|item| {
            let unit_price = item.unit_price.rounded();
            total += unit_price.multiply(item.quantity);
            json!({
                "product_id": item.source_id,
                "sku_id": item.variant_id(),
                "quantity": item.quantity,
                "unit_price": unit_price.to_string(),
            })
        })
        .collect();

    json!({
        "param_order_create_request": {
            "logistics_detail": {
                "shipment_address": order.shipping_address,
                "carrier_code": order.selected_shipping().map(|o| o.vendor_code.as_str()),
            },
            "product_list": product_list,
            "processing_duration": order.processing_duration(),
            "total_amount": total.to_string(),
            "currency": order.currency,
            "properties": {
                "platform": store.store_type.as_str(),
                "store_order_id": order.store_order_id,
            },
        }
    })
}

fn trade_id(response: &Value) -> Option<String> {
    let value = response.get("value")?.get("trade_id")?;
    domain::normalize::json_id(value).filter(|id| !id.is_empty())
}

impl<S, C, Ca, A> OrderAssembler<S, C, Ca, A>
where
    S: PlacedOrderStore,
    C: SupplierClient + Clone,
    Ca: CartSource,
    A: StoreApi,
{
    /// Places every submittable order of an assembled batch.
    ///
    /// The first failed supplier call aborts the batch. Placed orders are
    /// persisted in one atomic write; a duplicate trade at that point means
    /// purchases exist upstream without a local record, which is logged for
    /// review and reported as [`SourcingError::AlibabaUnknown`].
    #[tracing::instrument(skip(self, orders), fields(store = %store, orders = orders.len()))]
    pub async fn submit(
        &self,
        store: StoreRef,
        mut orders: Vec<AssembledOrder>,
    ) -> Result<AssembleOutcome> {
        // 1. Create one supplier order per submittable assembled order
        let mut trades: Vec<(usize, String)> = Vec::new();
        for (index, order) in orders.iter().enumerate().filter(|(_, o)| o.can_submit()) {
            let response = self
                .supplier
                .post(resources::ORDER_CREATE, order_payload(store, order))
                .await
                .and_then(check_response);

            let placed = match response {
                Ok(response) => trade_id(&response).ok_or_else(|| {
                    SourcingError::AlibabaUnknown("Supplier returned no trade id".to_string())
                }),
                Err(SourcingError::Supplier { message, .. }) => {
                    Err(SourcingError::AlibabaUnknown(message))
                }
                Err(e) => Err(e),
            };

            match placed {
                Ok(trade_id) => {
                    tracing::info!(trade_id = %trade_id, store_order_id = %order.store_order_id, "Supplier order created");
                    trades.push((index, trade_id));
                }
                Err(e) => {
                    metrics::counter!("sourcing_submission_failures_total").increment(1);
                    let created: Vec<&str> = trades.iter().map(|(_, t)| t.as_str()).collect();
                    tracing::error!(error = %e, created = ?created, "Submission aborted");
                    return Err(e);
                }
            }
        }

        if trades.is_empty() {
            return Ok(AssembleOutcome {
                orders,
                placed_order_ids: Vec::new(),
            });
        }

        // 2. Build the placed orders of the whole batch
        let mut placed = Vec::with_capacity(trades.len());
        for (index, trade_id) in &trades {
            let order = &orders[*index];
            placed.push(
                PlacedOrder::builder()
                    .trade_id(trade_id)
                    .store(store)
                    .store_order_id(&order.store_order_id)
                    .source_status(SourceStatus::Unpay)
                    .products_cost(order.product_total().amount())
                    .shipping_cost(order.shipping_fee().amount())
                    .currency(&order.currency)
                    .items(order.ok_items().filter_map(|item| item.to_placed_item()))
                    .build()?,
            );
        }
        combine_trade_ids(&mut placed);

        // 3. Persist atomically
        let placed_order_ids = match self.store.insert_batch(placed.clone()).await {
            Ok(ids) => ids,
            Err(StoreError::DuplicateTrade { .. }) => {
                metrics::counter!("sourcing_submission_failures_total").increment(1);
                let created: Vec<&str> = trades.iter().map(|(_, t)| t.as_str()).collect();
                tracing::error!(
                    trades = ?created,
                    "Duplicate placed order; supplier trades exist without a local record"
                );
                return Err(SourcingError::AlibabaUnknown("duplicate".to_string()));
            }
            Err(e) => {
                let created: Vec<&str> = trades.iter().map(|(_, t)| t.as_str()).collect();
                tracing::error!(error = %e, trades = ?created, "Failed to persist placed orders");
                return Err(e.into());
            }
        };

        // 4. Link storefront lines to their trades
        self.create_tracking(store, &mut placed).await;

        for (index, trade_id) in trades {
            orders[index].status = AssemblyStatus::Placed { trade_id };
        }
        metrics::counter!("sourcing_trades_placed_total").increment(placed_order_ids.len() as u64);
        tracing::info!(placed = placed_order_ids.len(), "Batch submitted");

        Ok(AssembleOutcome {
            orders,
            placed_order_ids,
        })
    }

    /// Creates one tracking record per cart line and stores its id on the
    /// placed items. Failures are logged; the placed orders stay valid.
    async fn create_tracking(&self, store: StoreRef, placed: &mut [PlacedOrder]) {
        let mut tracks: HashMap<CartLineKey, i64> = HashMap::new();

        for order in placed.iter_mut() {
            let mut changed = false;
            for item in &mut order.items {
                if let Some(id) = tracks.get(&item.order_data_id) {
                    item.order_track_id = Some(*id);
                    changed = true;
                    continue;
                }

                let request = FulfillRequest {
                    store,
                    order_id: item.order_data_id.order_id.clone(),
                    line_id: item.order_data_id.line_id.clone(),
                    source_order_id: item.fulfillment_source_id(&order.trade_id).to_string(),
                    source_type: self.config.source_type.clone(),
                };
                match self.store_api.post_order_fulfill(request).await {
                    Ok(id) => {
                        tracks.insert(item.order_data_id.clone(), id);
                        item.order_track_id = Some(id);
                        changed = true;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, line = %item.order_data_id, "Failed to create order tracking");
                    }
                }
            }

            if changed && let Err(e) = self.store.update(order).await {
                tracing::warn!(error = %e, trade_id = %order.trade_id, "Failed to store tracking ids");
            }
        }
    }
}

/// Marks items whose cart line is fulfilled by several trades with the
/// comma-joined list of those trades.
fn combine_trade_ids(placed: &mut [PlacedOrder]) {
    let mut trades: HashMap<CartLineKey, Vec<String>> = HashMap::new();
    for order in placed.iter() {
        for item in &order.items {
            let entry = trades.entry(item.order_data_id.clone()).or_default();
            if !entry.contains(&order.trade_id) {
                entry.push(order.trade_id.clone());
            }
        }
    }

    for order in placed.iter_mut() {
        for item in &mut order.items {
            if let Some(ids) = trades.get(&item.order_data_id).filter(|ids| ids.len() > 1) {
                item.combined_trade_ids = Some(ids.join(","));
            }
        }
    }
}

//! Supplier trade details and the mapping of supplier status vocabularies
//! onto [`SourceStatus`].

use common::SourceStatus;
use serde_json::Value;

use crate::{DomainError, Result, money::Money, normalize::json_id};

/// Maps a supplier payment/trade status. Case-insensitive.
pub fn payment_status(status: &str) -> Option<SourceStatus> {
    match status.trim().to_lowercase().as_str() {
        "unpay" => Some(SourceStatus::Unpay),
        "paying" => Some(SourceStatus::Paying),
        "pay_success" | "paid" | "undeliver" => Some(SourceStatus::Undeliver),
        "payment_failed" | "pay_failed" => Some(SourceStatus::PaymentFailed),
        "trade_close" | "closed" | "cancelled" => Some(SourceStatus::TradeClose),
        "delivering" => Some(SourceStatus::Delivering),
        "wait_confirm_receipt" => Some(SourceStatus::WaitConfirmReceipt),
        "trade_success" | "completed" => Some(SourceStatus::TradeSuccess),
        _ => None,
    }
}

/// Maps a supplier logistics status. Case-insensitive.
pub fn logistics_status(status: &str) -> Option<SourceStatus> {
    match status.trim().to_lowercase().as_str() {
        "undeliver" | "wait_seller_send" => Some(SourceStatus::Undeliver),
        "delivering" | "shipped" | "in_transit" => Some(SourceStatus::Delivering),
        "wait_buyer_receive" | "wait_confirm_receipt" => Some(SourceStatus::WaitConfirmReceipt),
        "received" | "trade_success" => Some(SourceStatus::TradeSuccess),
        _ => None,
    }
}

fn progress(status: SourceStatus) -> u8 {
    match status {
        SourceStatus::Unpay => 0,
        SourceStatus::Paying => 1,
        SourceStatus::Undeliver => 2,
        SourceStatus::Delivering => 3,
        SourceStatus::WaitConfirmReceipt => 4,
        SourceStatus::TradeSuccess => 5,
        SourceStatus::PaymentFailed | SourceStatus::TradeClose => 6,
    }
}

/// Outcome of mapping a trade's statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMapping {
    Mapped(SourceStatus),
    /// The payment status is not in the lookup table; keep the local state.
    Unrecognized(String),
}

/// A shipment reported for a trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shipment {
    pub tracking_number: String,
    pub tracking_url: Option<String>,
    pub product_ids: Vec<String>,
}

/// Supplier-side view of a placed trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeDetails {
    pub trade_status: String,
    pub logistics_status: Option<String>,
    pub shipping_fee: Option<Money>,
    pub shipments: Vec<Shipment>,
}

impl TradeDetails {
    pub fn new(trade_status: impl Into<String>) -> Self {
        Self {
            trade_status: trade_status.into(),
            logistics_status: None,
            shipping_fee: None,
            shipments: Vec::new(),
        }
    }

    /// Parses an order-get response (`{"value": {...}}`).
    pub fn from_response(response: &Value) -> Result<Self> {
        let value = response
            .get("value")
            .ok_or_else(|| DomainError::InvalidTradeDetails("missing value".to_string()))?;

        let trade_status = value
            .get("trade_status")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::InvalidTradeDetails("missing trade_status".to_string()))?;

        let shipments = value
            .get("logistics_orders")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|order| {
                Some(Shipment {
                    tracking_number: order.get("tracking_number").and_then(json_id)?,
                    tracking_url: order
                        .get("tracking_url")
                        .and_then(Value::as_str)
                        .filter(|u| !u.is_empty())
                        .map(str::to_string),
                    product_ids: order
                        .get("product_ids")
                        .and_then(Value::as_array)
                        .map(|ids| ids.iter().filter_map(json_id).collect())
                        .unwrap_or_default(),
                })
            })
            .collect();

        Ok(Self {
            trade_status: trade_status.to_string(),
            logistics_status: value
                .get("logistics_status")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            shipping_fee: value.get("shipping_fee").and_then(Money::from_json),
            shipments,
        })
    }

    /// Maps the trade onto a local status.
    ///
    /// The logistics status only refines a paid, non-failed trade and never
    /// moves it backwards. An unrecognized logistics status is ignored.
    pub fn status(&self) -> StatusMapping {
        let Some(payment) = payment_status(&self.trade_status) else {
            return StatusMapping::Unrecognized(self.trade_status.clone());
        };

        if !payment.is_paid() {
            return StatusMapping::Mapped(payment);
        }

        let refined = self.logistics_status.as_deref().and_then(|raw| {
            let mapped = logistics_status(raw);
            if mapped.is_none() {
                tracing::warn!(logistics_status = raw, "Unrecognized logistics status");
            }
            mapped
        });

        match refined {
            Some(logistics) if progress(logistics) > progress(payment) => {
                StatusMapping::Mapped(logistics)
            }
            _ => StatusMapping::Mapped(payment),
        }
    }

    /// The shipment carrying a product, if the supplier reported one.
    pub fn shipment_for(&self, product_id: &str) -> Option<&Shipment> {
        self.shipments
            .iter()
            .find(|s| s.product_ids.iter().any(|id| id == product_id))
    }

    /// Tracking page of the first shipment that has one.
    pub fn tracking_url(&self) -> Option<&str> {
        self.shipments.iter().find_map(|s| s.tracking_url.as_deref())
    }
}

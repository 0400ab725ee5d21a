//! Supplier-side status of a placed order.

use serde::{Deserialize, Serialize};

/// The supplier-side state of a placed order.
///
/// State transitions:
/// ```text
/// Unpay ──► Paying ──► Undeliver ──► Delivering ──► WaitConfirmReceipt ──► TradeSuccess
///   │          │
///   │          └──► PaymentFailed
///   └──────────────────────────────► TradeClose
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// Trade created, waiting for payment.
    #[default]
    Unpay,

    /// Payment submitted, not yet confirmed.
    Paying,

    /// Paid, waiting for the supplier to ship.
    Undeliver,

    /// Shipped, in transit.
    Delivering,

    /// Delivered, waiting for the buyer to confirm receipt.
    WaitConfirmReceipt,

    /// Trade finished (terminal state).
    TradeSuccess,

    /// Payment was rejected (terminal state).
    PaymentFailed,

    /// Trade was closed by either party (terminal state).
    TradeClose,
}

impl SourceStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SourceStatus::TradeSuccess | SourceStatus::PaymentFailed | SourceStatus::TradeClose
        )
    }

    /// Returns true once the supplier has been paid.
    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            SourceStatus::Undeliver
                | SourceStatus::Delivering
                | SourceStatus::WaitConfirmReceipt
                | SourceStatus::TradeSuccess
        )
    }

    /// Returns true for states driven by the logistics vocabulary.
    pub fn is_logistics(&self) -> bool {
        matches!(
            self,
            SourceStatus::Delivering | SourceStatus::WaitConfirmReceipt | SourceStatus::TradeSuccess
        )
    }

    /// Returns the state name as stored and reported to storefronts.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Unpay => "unpay",
            SourceStatus::Paying => "paying",
            SourceStatus::Undeliver => "undeliver",
            SourceStatus::Delivering => "delivering",
            SourceStatus::WaitConfirmReceipt => "wait_confirm_receipt",
            SourceStatus::TradeSuccess => "trade_success",
            SourceStatus::PaymentFailed => "payment_failed",
            SourceStatus::TradeClose => "trade_close",
        }
    }

    /// Parses a stored state name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "unpay" => Some(SourceStatus::Unpay),
            "paying" => Some(SourceStatus::Paying),
            "undeliver" => Some(SourceStatus::Undeliver),
            "delivering" => Some(SourceStatus::Delivering),
            "wait_confirm_receipt" => Some(SourceStatus::WaitConfirmReceipt),
            "trade_success" => Some(SourceStatus::TradeSuccess),
            "payment_failed" => Some(SourceStatus::PaymentFailed),
            "trade_close" => Some(SourceStatus::TradeClose),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SourceStatus; 8] = [
        SourceStatus::Unpay,
        SourceStatus::Paying,
        SourceStatus::Undeliver,
        SourceStatus::Delivering,
        SourceStatus::WaitConfirmReceipt,
        SourceStatus::TradeSuccess,
        SourceStatus::PaymentFailed,
        SourceStatus::TradeClose,
    ];

    #[test]
    fn test_default_state_is_unpay() {
        assert_eq!(SourceStatus::default(), SourceStatus::Unpay);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SourceStatus::Unpay.is_terminal());
        assert!(!SourceStatus::Paying.is_terminal());
        assert!(!SourceStatus::Undeliver.is_terminal());
        assert!(!SourceStatus::Delivering.is_terminal());
        assert!(!SourceStatus::WaitConfirmReceipt.is_terminal());
        assert!(SourceStatus::TradeSuccess.is_terminal());
        assert!(SourceStatus::PaymentFailed.is_terminal());
        assert!(SourceStatus::TradeClose.is_terminal());
    }

    #[test]
    fn test_paid_states() {
        assert!(!SourceStatus::Unpay.is_paid());
        assert!(!SourceStatus::Paying.is_paid());
        assert!(SourceStatus::Undeliver.is_paid());
        assert!(SourceStatus::TradeSuccess.is_paid());
        assert!(!SourceStatus::PaymentFailed.is_paid());
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in ALL {
            assert_eq!(SourceStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SourceStatus::parse("lost"), None);
    }

    #[test]
    fn test_serialization_matches_as_str() {
        for status in ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}

//! Sourcing error types.

use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

/// How a supplier error should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupplierErrorKind {
    /// Call limit reached; retry after a delay.
    RateLimited,
    /// Price changed between requests; the user must refresh.
    StalePrice,
    /// Authorization expired; the user must reconnect the account.
    ReconnectRequired,
    Unknown,
}

impl SupplierErrorKind {
    /// Classifies an upstream error message.
    pub fn classify(message: &str) -> Self {
        let message = message.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| message.contains(n));

        if any(&["call limit", "calllimit", "frequency", "rate limit", "ratelimit", "too many requests"]) {
            SupplierErrorKind::RateLimited
        } else if any(&["price changed", "price mismatch", "price has changed"]) {
            SupplierErrorKind::StalePrice
        } else if any(&["token", "session expired", "reconnect", "unauthorized"]) {
            SupplierErrorKind::ReconnectRequired
        } else {
            SupplierErrorKind::Unknown
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SupplierErrorKind::RateLimited)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierErrorKind::RateLimited => "rate_limited",
            SupplierErrorKind::StalePrice => "stale_price",
            SupplierErrorKind::ReconnectRequired => "reconnect_required",
            SupplierErrorKind::Unknown => "unknown",
        }
    }
}

/// Errors that can occur during sourcing operations.
#[derive(Debug, Error)]
pub enum SourcingError {
    /// Some requested cart lines could not be found; the caller should refresh.
    #[error("Cart lines not found, please refresh the page: {}", .0.join(", "))]
    UnresolvedCart(Vec<String>),

    /// Submission failed and the whole batch was aborted.
    #[error("Supplier order failed: {0}")]
    AlibabaUnknown(String),

    /// The supplier rejected a call.
    #[error("Supplier error ({}): {message}", .kind.as_str())]
    Supplier {
        kind: SupplierErrorKind,
        message: String,
    },

    #[error("Placed order not found: {0}")]
    PlacedOrderNotFound(String),

    /// Storefront tracking call failed.
    #[error("Store API error: {0}")]
    StoreApi(String),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SourcingError {
    /// Builds a supplier error, classifying the message.
    pub fn supplier(message: impl Into<String>) -> Self {
        let message = message.into();
        SourcingError::Supplier {
            kind: SupplierErrorKind::classify(&message),
            message,
        }
    }

    /// True when retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourcingError::Supplier { kind, .. } if kind.is_retryable())
    }
}

/// Convenience type alias for sourcing results.
pub type Result<T> = std::result::Result<T, SourcingError>;

//! Domain error types.

use thiserror::Error;

/// Errors that can occur while interpreting supplier or cart data.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A raw supplier product could not be normalized.
    #[error("Invalid product {product_id}: {reason}")]
    InvalidProduct { product_id: String, reason: String },

    /// A trade details response did not have the expected shape.
    #[error("Invalid trade details: {0}")]
    InvalidTradeDetails(String),

    /// A cart line key could not be parsed.
    #[error("Invalid cart line key: {0}")]
    InvalidCartKey(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<common::InvalidCartLineKey> for DomainError {
    fn from(err: common::InvalidCartLineKey) -> Self {
        DomainError::InvalidCartKey(err.0)
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

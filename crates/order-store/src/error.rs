use common::{PlacedOrderId, StoreType};
use thiserror::Error;

/// Errors that can occur when interacting with the placed order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A placed order with the same store order and trade already exists.
    /// The whole batch containing it was rejected.
    #[error(
        "Duplicate placed order: {store_type}:{store_id} order {store_order_id} trade {trade_id}"
    )]
    DuplicateTrade {
        store_type: StoreType,
        store_id: i64,
        store_order_id: String,
        trade_id: String,
    },

    /// The batch handed to the store is malformed.
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),

    /// The placed order was not found.
    #[error("Placed order not found: {0}")]
    NotFound(PlacedOrderId),

    /// A stored row could not be mapped back to a placed order.
    #[error("Invalid stored row: {0}")]
    InvalidRow(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for placed order store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

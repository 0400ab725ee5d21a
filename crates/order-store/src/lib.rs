//! Storage for placed supplier orders.
//!
//! A placed order is written once, in the same batch as every other order
//! created by one submission, and afterwards only mutated by status
//! reconciliation or deleted by explicit tracking removal.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod record;
pub mod store;

pub use common::{CartLineKey, PlacedOrderId, SourceStatus, StoreRef, StoreType};
pub use error::{Result, StoreError};
pub use memory::InMemoryPlacedOrderStore;
pub use postgres::PostgresPlacedOrderStore;
pub use query::PlacedOrderQuery;
pub use record::{PlacedOrder, PlacedOrderBuilder, PlacedOrderItem, PlacedOrderKey};
pub use store::{PlacedOrderStore, PlacedOrderStoreExt};

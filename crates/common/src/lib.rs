//! Identifiers and small value types shared by every crate in the workspace.

pub mod status;
pub mod types;

pub use status::SourceStatus;
pub use types::{CartLineKey, InvalidCartLineKey, PlacedOrderId, StoreRef, StoreType};

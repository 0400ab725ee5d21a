//! External collaborators of the engine.

pub mod cart;
pub mod store_api;
pub mod supplier;

pub use cart::{CartSource, InMemoryCartSource};
pub use store_api::{FulfillRequest, FulfillUpdate, InMemoryStoreApi, StoreApi};
pub use supplier::{InMemorySupplierClient, SupplierClient, check_response, resources};

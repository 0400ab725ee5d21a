//! The order-placement engine.
//!
//! Turns storefront cart lines into supplier purchase orders and keeps the
//! placed orders in step with the supplier afterwards:
//!
//! - [`CatalogCache`] batches and caches supplier product lookups
//! - [`CartSnapshotReader`] loads the cart lines of a batch
//! - [`ShippingResolver`] quotes carriers per supplier
//! - [`OrderAssembler`] resolves a batch into orders and places them
//! - [`OrderLifecycle`] reconciles placed orders with their trades
//!
//! External systems are reached through the traits in [`services`], each
//! with an in-memory implementation for tests.

pub mod assembler;
pub mod cart_reader;
pub mod catalog_cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod services;
pub mod shipping_resolver;

pub use assembler::{AssembleOutcome, AssembleRequest, OrderAssembler};
pub use cart_reader::CartSnapshotReader;
pub use catalog_cache::{CatalogCache, RawEntry};
pub use config::SourcingConfig;
pub use error::{Result, SourcingError, SupplierErrorKind};
pub use lifecycle::{OrderLifecycle, ReconciledOrder, ReloadOutcome, RemovedTracking};
pub use services::{
    CartSource, FulfillRequest, FulfillUpdate, InMemoryCartSource, InMemoryStoreApi,
    InMemorySupplierClient, StoreApi, SupplierClient,
};
pub use shipping_resolver::{ShippingRequestItem, ShippingResolver, SupplierQuote};

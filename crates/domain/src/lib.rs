//! Business types and rules of the sourcing engine.
//!
//! This crate provides:
//! - Canonical catalog products, variants and price ladders, normalized from
//!   raw supplier payloads
//! - Cart line snapshots, simple or bundled
//! - Assembled orders and per-line errors
//! - Shipping options and the merging of options across suppliers
//! - Supplier trade details and status lookup tables

pub mod assembly;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod normalize;
pub mod shipping;
pub mod trade;

pub use assembly::{
    AssembledLineItem, AssembledOrder, AssemblyStatus, LineError, OrderError, apportion,
};
pub use cart::{CartLineSnapshot, LineKind, SourcedProduct};
pub use catalog::{
    CartVariant, CatalogEntry, CatalogProduct, Ladder, LadderStep, PriceLadder, ProcessingLadder,
    Supplier, Variant, WarehouseStock,
};
pub use error::{DomainError, Result};
pub use money::Money;
pub use shipping::{ShippingAddress, ShippingOption, filter_shippings, shared_codes};
pub use trade::{Shipment, StatusMapping, TradeDetails, logistics_status, payment_status};

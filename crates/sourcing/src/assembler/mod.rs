//! Order assembly and submission.
//!
//! Assembly runs in two phases over one batch of cart lines:
//!
//! 1. **Resolve**: read the cart, look every product up in the catalog,
//!    validate each line and group the lines into supplier orders with a
//!    shipping selection. Read-only; business-rule failures are attached to
//!    lines and orders, never raised.
//! 2. **Submit**: create one supplier order per submittable assembled order,
//!    then persist every placed order of the batch in one atomic write and
//!    link the storefront lines to their trades.

mod partition;
mod resolve;
mod submit;

use std::collections::HashMap;

use common::{CartLineKey, PlacedOrderId, StoreRef};
use domain::AssembledOrder;
use order_store::PlacedOrderStore;
use serde::{Deserialize, Serialize};

use crate::{
    cart_reader::CartSnapshotReader,
    catalog_cache::CatalogCache,
    config::SourcingConfig,
    error::Result,
    services::{CartSource, StoreApi, SupplierClient},
    shipping_resolver::ShippingResolver,
};

pub use partition::{Partition, separate_order_by_mapping, separate_order_by_supplier};
pub use resolve::{PlacedItems, resolve_order};

fn default_use_cache() -> bool {
    true
}

/// A batch of cart lines to assemble, and optionally submit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssembleRequest {
    pub store: StoreRef,
    pub cart_line_ids: Vec<CartLineKey>,

    /// Manual grouping of lines per storefront order. Lines of an order
    /// that no group mentions are placed in an extra group.
    #[serde(default)]
    pub splits: HashMap<String, Vec<Vec<CartLineKey>>>,

    /// Vendor codes keyed by `"{store_order_id}_{split}"`.
    #[serde(default)]
    pub shipping_selections: HashMap<String, String>,

    /// Keep every offered shipping option instead of only the selected one.
    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_use_cache")]
    pub use_cache: bool,

    #[serde(default)]
    pub validate_only: bool,
}

impl AssembleRequest {
    pub fn new(store: StoreRef, cart_line_ids: impl IntoIterator<Item = CartLineKey>) -> Self {
        Self {
            store,
            cart_line_ids: cart_line_ids.into_iter().collect(),
            splits: HashMap::new(),
            shipping_selections: HashMap::new(),
            verbose: false,
            use_cache: true,
            validate_only: false,
        }
    }

    pub fn with_split(
        mut self,
        store_order_id: impl Into<String>,
        groups: Vec<Vec<CartLineKey>>,
    ) -> Self {
        self.splits.insert(store_order_id.into(), groups);
        self
    }

    pub fn with_shipping(mut self, selection_key: impl Into<String>, code: impl Into<String>) -> Self {
        self.shipping_selections
            .insert(selection_key.into(), code.into());
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn validate_only(mut self) -> Self {
        self.validate_only = true;
        self
    }
}

/// Assembled orders of a batch and the placed orders created from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembleOutcome {
    pub orders: Vec<AssembledOrder>,
    pub placed_order_ids: Vec<PlacedOrderId>,
}

/// Assembles cart lines into supplier orders and places them.
pub struct OrderAssembler<S, C, Ca, A>
where
    S: PlacedOrderStore,
    C: SupplierClient,
    Ca: CartSource,
    A: StoreApi,
{
    store: S,
    supplier: C,
    catalog: CatalogCache<C>,
    shipping: ShippingResolver<C>,
    carts: CartSnapshotReader<Ca>,
    store_api: A,
    config: SourcingConfig,
}

impl<S, C, Ca, A> OrderAssembler<S, C, Ca, A>
where
    S: PlacedOrderStore,
    C: SupplierClient + Clone,
    Ca: CartSource,
    A: StoreApi,
{
    pub fn new(store: S, supplier: C, carts: Ca, store_api: A, config: SourcingConfig) -> Self {
        Self {
            catalog: CatalogCache::new(supplier.clone(), &config),
            shipping: ShippingResolver::new(supplier.clone(), &config),
            carts: CartSnapshotReader::new(carts),
            store,
            supplier,
            store_api,
            config,
        }
    }

    pub fn catalog(&self) -> &CatalogCache<C> {
        &self.catalog
    }

    /// Assembles the batch and, unless `validate_only` is set, submits it.
    ///
    /// Submission always reads the catalog from the supplier, whatever
    /// `use_cache` says, so placed prices are current.
    pub async fn process(&self, request: &AssembleRequest) -> Result<AssembleOutcome> {
        if request.validate_only {
            let orders = self.assemble(request).await?;
            return Ok(AssembleOutcome {
                orders,
                placed_order_ids: Vec::new(),
            });
        }

        let fresh = AssembleRequest {
            use_cache: false,
            ..request.clone()
        };
        let orders = self.assemble(&fresh).await?;
        self.submit(request.store, orders).await
    }
}

//! Phase A: resolving cart lines against the catalog.

use std::collections::HashMap;
use std::time::Instant;

use common::{CartLineKey, StoreRef};
use domain::{
    AssembledLineItem, AssembledOrder, CartLineSnapshot, CartVariant, CatalogEntry,
    CatalogProduct, LineError, Money, apportion,
};
use order_store::{PlacedOrder, PlacedOrderQuery, PlacedOrderStore};

use super::{AssembleRequest, OrderAssembler};
use crate::{
    error::Result,
    services::{CartSource, StoreApi, SupplierClient},
};

/// Trades that already contain a `(cart line, product:variant)` pair.
#[derive(Debug, Clone, Default)]
pub struct PlacedItems {
    trades: HashMap<(CartLineKey, String), Vec<String>>,
}

impl PlacedItems {
    pub fn from_orders(orders: &[PlacedOrder]) -> Self {
        let mut trades: HashMap<(CartLineKey, String), Vec<String>> = HashMap::new();
        for order in orders {
            for item in &order.items {
                let entry = trades
                    .entry((item.order_data_id.clone(), item.source_key()))
                    .or_default();
                if !entry.contains(&order.trade_id) {
                    entry.push(order.trade_id.clone());
                }
            }
        }
        Self { trades }
    }

    pub fn trades_for(&self, line: &CartLineKey, source_key: &str) -> Option<&[String]> {
        self.trades
            .get(&(line.clone(), source_key.to_string()))
            .map(Vec::as_slice)
    }
}

/// Resolves the lines of one storefront order into assembled items.
///
/// Lines are first checked on their own: catalog lookup, orderability,
/// variant, stock and earlier placements. Minimum quantity, processing
/// time and price tier then apply to the quantity still orderable per
/// product across the order, so a failed line never lifts its siblings
/// over a minimum or into a cheaper tier.
pub fn resolve_order(
    lines: &[CartLineSnapshot],
    catalog: &HashMap<String, CatalogEntry>,
    placed: &PlacedItems,
) -> Vec<AssembledLineItem> {
    // 1. Rules that hold for a line on its own
    let mut items: Vec<AssembledLineItem> = lines
        .iter()
        .flat_map(|line| {
            line.sourced_products().into_iter().map(move |product| {
                let mut item = AssembledLineItem::seed(line, &product);
                item.error = check_line(&mut item, &product.variant, catalog, placed);
                item
            })
        })
        .collect();

    // 2. Quantity rules against what is still orderable; every new failure
    //    shrinks an aggregate, so start over until nothing changes
    'tiers: loop {
        let requested = orderable_quantities(&items);
        for item in items.iter_mut().filter(|i| i.is_ok()) {
            let Some(product) = catalog.get(&item.source_id).and_then(CatalogEntry::product) else {
                continue;
            };
            let quantity = requested
                .get(&item.source_id)
                .copied()
                .unwrap_or(item.quantity);
            if let Some(error) = price_line(item, product, quantity) {
                item.error = Some(error);
                item.set_price(Money::zero());
                continue 'tiers;
            }
        }
        break;
    }

    // 3. Bundle apportioning
    split_bundle_prices(&mut items);
    for item in &mut items {
        item.evaluate_cost();
    }

    items
}

/// Quantity per product over the lines without an error.
fn orderable_quantities(items: &[AssembledLineItem]) -> HashMap<String, u32> {
    let mut requested: HashMap<String, u32> = HashMap::new();
    for item in items.iter().filter(|i| i.is_ok()) {
        *requested.entry(item.source_id.clone()).or_default() += item.quantity;
    }
    requested
}

fn check_line(
    item: &mut AssembledLineItem,
    wanted: &CartVariant,
    catalog: &HashMap<String, CatalogEntry>,
    placed: &PlacedItems,
) -> Option<LineError> {
    let product = match catalog.get(&item.source_id) {
        Some(CatalogEntry::Found(product)) => product,
        Some(CatalogEntry::Failed { error, .. }) => return Some(LineError::Upstream(error.clone())),
        None => return Some(LineError::ProductNotFound),
    };

    item.supplier = Some(product.supplier.clone());
    if item.title.is_empty() {
        item.title = product.title.clone();
    }
    item.image = product.images.first().cloned();

    if !product.is_orderable {
        return Some(LineError::NotDropshipping);
    }

    let Some(variant) = product.match_variant(wanted) else {
        return Some(LineError::VariantNotFound);
    };
    if variant.image.is_some() {
        item.image = variant.image.clone();
    }
    let in_stock = variant.has_stock_for(item.quantity);
    item.variant = Some(variant);

    if !in_stock {
        return Some(LineError::OutOfStock);
    }

    let trades = item
        .source_key()
        .and_then(|key| placed.trades_for(&item.order_data_id, &key).map(<[String]>::to_vec));
    trades.map(LineError::AlreadyPlaced)
}

/// Applies the minimum quantity, processing time and price tier for the
/// product's orderable `quantity`.
fn price_line(
    item: &mut AssembledLineItem,
    product: &CatalogProduct,
    quantity: u32,
) -> Option<LineError> {
    if quantity < product.min_order_quantity {
        return Some(LineError::MinimumQuantity(product.min_order_quantity));
    }

    item.processing_time = product.processing_time_for(quantity);

    let price = item
        .variant
        .as_ref()
        .and_then(|variant| variant.price_for(quantity))
        .or_else(|| product.price_ladder.price_for(quantity));
    let Some(price) = price else {
        return Some(LineError::PriceUnavailable);
    };
    item.set_price(price);
    None
}

fn split_bundle_prices(items: &mut [AssembledLineItem]) {
    let mut bundles: Vec<CartLineKey> = Vec::new();
    for item in items.iter().filter(|i| i.is_bundle) {
        if !bundles.contains(&item.order_data_id) {
            bundles.push(item.order_data_id.clone());
        }
    }

    for line in bundles {
        let members: Vec<usize> = (0..items.len())
            .filter(|i| items[*i].order_data_id == line)
            .collect();
        let costs: Vec<_> = members.iter().map(|i| items[*i].total_price).collect();
        let paid = items[members[0]].paid_total;

        for (index, share) in members.into_iter().zip(apportion(paid, &costs)) {
            items[index].split_price = Some(share);
        }
    }
}

impl<S, C, Ca, A> OrderAssembler<S, C, Ca, A>
where
    S: PlacedOrderStore,
    C: SupplierClient + Clone,
    Ca: CartSource,
    A: StoreApi,
{
    /// Resolves a batch into assembled orders without placing anything.
    ///
    /// Fails only when the cart cannot be read or the placed-order lookup
    /// fails; every business-rule problem is reported on the returned data.
    #[tracing::instrument(skip(self, request), fields(store = %request.store, lines = request.cart_line_ids.len()))]
    pub async fn assemble(&self, request: &AssembleRequest) -> Result<Vec<AssembledOrder>> {
        metrics::counter!("sourcing_assemblies_total").increment(1);
        let started = Instant::now();

        // 1. Cart lines by storefront order
        let carts = self.carts.read(&request.cart_line_ids).await?;

        // 2. Every catalog product of the batch, in one lookup
        let product_ids: Vec<String> = carts
            .values()
            .flatten()
            .flat_map(CartLineSnapshot::sourced_products)
            .map(|product| product.source_id)
            .collect();
        let catalog: HashMap<String, CatalogEntry> = self
            .catalog
            .get_products(&product_ids, request.use_cache)
            .await
            .into_iter()
            .map(|entry| (entry.id().to_string(), entry))
            .collect();

        // 3. Items placed by earlier submissions of these lines
        let keys: Vec<CartLineKey> = carts.values().flatten().map(|l| l.key.clone()).collect();
        let placed = self.placed_items(request.store, keys).await?;

        // 4. Resolve and partition each storefront order
        let mut orders = Vec::new();
        for (store_order_id, lines) in &carts {
            let items = resolve_order(lines, &catalog, &placed);
            orders.extend(self.partition(store_order_id, lines, items, request).await);
        }

        for error in orders.iter().flat_map(|o| &o.items).filter_map(|i| i.error.as_ref()) {
            metrics::counter!("sourcing_line_errors_total", "reason" => error.reason()).increment(1);
        }
        metrics::histogram!("sourcing_assembly_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(orders = orders.len(), "Batch assembled");

        Ok(orders)
    }

    async fn placed_items(&self, store: StoreRef, keys: Vec<CartLineKey>) -> Result<PlacedItems> {
        if keys.is_empty() {
            return Ok(PlacedItems::default());
        }
        let orders = self
            .store
            .query(PlacedOrderQuery::for_store(store).order_data_ids(keys))
            .await?;
        Ok(PlacedItems::from_orders(&orders))
    }
}

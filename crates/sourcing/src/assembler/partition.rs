//! Grouping resolved items into supplier orders and selecting shipping.

use std::collections::{BTreeMap, HashMap};

use common::CartLineKey;
use domain::{
    AssembledLineItem, AssembledOrder, AssemblyStatus, CartLineSnapshot, LineError, OrderError,
    ShippingAddress, ShippingOption, filter_shippings, shared_codes,
};
use order_store::PlacedOrderStore;

use super::{AssembleRequest, OrderAssembler};
use crate::{
    services::{CartSource, StoreApi, SupplierClient},
    shipping_resolver::{ShippingRequestItem, SupplierQuote},
};

struct SupplierGroup {
    suppliers: Vec<String>,
    options: Vec<ShippingOption>,
    items: Vec<AssembledLineItem>,
}

/// Groups items by supplier and shipping compatibility.
///
/// Items of a supplier already in a group join that group. Otherwise an
/// item joins the most recent group when its supplier shares at least one
/// carrier with it, and starts a new group when it does not.
pub fn separate_order_by_supplier(
    items: Vec<AssembledLineItem>,
    quotes: &BTreeMap<String, SupplierQuote>,
) -> Vec<Vec<AssembledLineItem>> {
    let mut groups: Vec<SupplierGroup> = Vec::new();

    for item in items {
        let supplier = item.supplier_id().unwrap_or_default().to_string();

        if let Some(group) = groups.iter_mut().find(|g| g.suppliers.contains(&supplier)) {
            group.items.push(item);
            continue;
        }

        let options = quotes
            .get(&supplier)
            .and_then(|quote| quote.as_ref().ok())
            .cloned()
            .unwrap_or_default();

        if let Some(group) = groups.last_mut() {
            let shared = shared_codes(&group.options, &options);
            if !shared.is_empty() {
                group.options.retain(|o| shared.contains(&o.vendor_code));
                group.suppliers.push(supplier);
                group.items.push(item);
                continue;
            }
        }

        groups.push(SupplierGroup {
            suppliers: vec![supplier],
            options,
            items: vec![item],
        });
    }

    groups.into_iter().map(|g| g.items).collect()
}

/// Result of grouping items by an explicit mapping.
#[derive(Debug, Default)]
pub struct Partition {
    pub groups: Vec<Vec<AssembledLineItem>>,

    /// Items that cannot be ordered as mapped, with their error set.
    pub rejected: Vec<AssembledLineItem>,
}

/// Groups items following a caller-supplied list of cart line groups.
///
/// A bundle line mapped into more than one group is rejected with
/// [`LineError::BundleSplit`] on every member. Items whose line is not
/// mapped at all are collected into one extra group.
pub fn separate_order_by_mapping(
    items: Vec<AssembledLineItem>,
    mapping: &[Vec<CartLineKey>],
) -> Partition {
    let mut partition = Partition {
        groups: vec![Vec::new(); mapping.len()],
        rejected: Vec::new(),
    };
    let mut unmapped = Vec::new();

    for mut item in items {
        let targets: Vec<usize> = mapping
            .iter()
            .enumerate()
            .filter(|(_, group)| group.contains(&item.order_data_id))
            .map(|(index, _)| index)
            .collect();

        match targets.as_slice() {
            [] => unmapped.push(item),
            [_, _, ..] if item.is_bundle => {
                item.error = Some(LineError::BundleSplit);
                partition.rejected.push(item);
            }
            [first, ..] => partition.groups[*first].push(item),
        }
    }

    if !unmapped.is_empty() {
        partition.groups.push(unmapped);
    }
    partition.groups.retain(|group| !group.is_empty());
    partition
}

/// Merges the suppliers' options of an order and picks one.
///
/// Selection order: the caller's choice for the order, the shipping method
/// recorded on the cart, then the cheapest option.
fn apply_shipping(
    order: &mut AssembledOrder,
    quotes: &BTreeMap<String, SupplierQuote>,
    selections: &HashMap<String, String>,
    verbose: bool,
) {
    let mut suppliers: Vec<&str> = Vec::new();
    for supplier in order.items.iter().filter_map(AssembledLineItem::supplier_id) {
        if !suppliers.contains(&supplier) {
            suppliers.push(supplier);
        }
    }

    let mut option_groups = Vec::with_capacity(suppliers.len());
    for supplier in suppliers {
        match quotes.get(supplier) {
            Some(Ok(options)) => option_groups.push(options.clone()),
            Some(Err(message)) => {
                order.status = AssemblyStatus::Error {
                    error: OrderError::ShippingQuote(message.clone()),
                };
                return;
            }
            None => option_groups.push(Vec::new()),
        }
    }
    order.shipping_options = filter_shippings(&option_groups, None, None);

    let explicit = selections.get(&order.selection_key()).cloned();
    let recorded = order.items.iter().find_map(|i| i.shipping_method.clone());
    let cheapest = order
        .shipping_options
        .iter()
        .min_by(|a, b| a.fee.cmp(&b.fee).then_with(|| a.vendor_code.cmp(&b.vendor_code)))
        .map(|o| o.vendor_code.clone());

    let selected = [explicit, recorded, cheapest]
        .into_iter()
        .flatten()
        .any(|code| order.select_shipping(&code));

    if !selected {
        order.status = AssemblyStatus::Error {
            error: OrderError::NoShippingOption,
        };
        return;
    }

    if !verbose {
        order.shipping_options.retain(|o| o.selected);
    }
}

fn shipping_request(items: &[AssembledLineItem]) -> Vec<ShippingRequestItem> {
    items
        .iter()
        .filter_map(|item| {
            Some(ShippingRequestItem::new(
                item.source_id.clone(),
                item.quantity,
                item.supplier_id()?,
            ))
        })
        .collect()
}

impl<S, C, Ca, A> OrderAssembler<S, C, Ca, A>
where
    S: PlacedOrderStore,
    C: SupplierClient + Clone,
    Ca: CartSource,
    A: StoreApi,
{
    /// Builds the assembled orders of one storefront order.
    ///
    /// Items with errors end up in one trailing order with a
    /// [`OrderError::LineErrors`] status.
    pub(super) async fn partition(
        &self,
        store_order_id: &str,
        lines: &[CartLineSnapshot],
        items: Vec<AssembledLineItem>,
        request: &AssembleRequest,
    ) -> Vec<AssembledOrder> {
        let address = lines
            .first()
            .map(|line| line.shipping_address.clone())
            .unwrap_or_default();
        let (ok, mut failed): (Vec<_>, Vec<_>) =
            items.into_iter().partition(AssembledLineItem::is_ok);

        let mut groups = Vec::new();
        match request.splits.get(store_order_id) {
            Some(mapping) => {
                let partition = separate_order_by_mapping(ok, mapping);
                failed.extend(partition.rejected);
                for group in partition.groups {
                    let quotes = self.quote(&address, &group, request.use_cache).await;
                    groups.push((group, quotes));
                }
            }
            None if !ok.is_empty() => {
                let quotes = self.quote(&address, &ok, request.use_cache).await;
                for group in separate_order_by_supplier(ok, &quotes) {
                    groups.push((group, quotes.clone()));
                }
            }
            None => {}
        }

        let mut orders = Vec::with_capacity(groups.len() + 1);
        for (items, quotes) in groups {
            let mut order = AssembledOrder::new(store_order_id, orders.len() as u32, address.clone());
            order.items = items;
            apply_shipping(&mut order, &quotes, &request.shipping_selections, request.verbose);
            orders.push(order);
        }

        if !failed.is_empty() {
            let mut order = AssembledOrder::new(store_order_id, orders.len() as u32, address);
            order.items = failed;
            order.status = AssemblyStatus::Error {
                error: OrderError::LineErrors,
            };
            orders.push(order);
        }

        orders
    }

    async fn quote(
        &self,
        address: &ShippingAddress,
        items: &[AssembledLineItem],
        use_cache: bool,
    ) -> BTreeMap<String, SupplierQuote> {
        self.shipping
            .get_order_shipping_costs(address, &shipping_request(items), use_cache)
            .await
    }
}

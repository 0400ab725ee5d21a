//! Assembled orders: cart lines resolved against the catalog and grouped
//! into supplier purchase orders.

use common::CartLineKey;
use order_store::PlacedOrderItem;
use serde::{Serialize, Serializer};

use crate::{
    cart::{CartLineSnapshot, SourcedProduct},
    catalog::{Supplier, Variant},
    money::Money,
    shipping::{ShippingAddress, ShippingOption},
};

/// Why a line cannot be ordered. Attached to the line, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    ProductNotFound,
    /// Error reported by the supplier for the catalog batch holding this product.
    Upstream(String),
    NotDropshipping,
    MinimumQuantity(u32),
    VariantNotFound,
    /// Neither the variant nor the product has a price for the quantity.
    PriceUnavailable,
    OutOfStock,
    /// Already part of these placed trades.
    AlreadyPlaced(Vec<String>),
    BundleSplit,
}

impl LineError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            LineError::ProductNotFound => "product_not_found",
            LineError::Upstream(_) => "upstream",
            LineError::NotDropshipping => "not_dropshipping",
            LineError::MinimumQuantity(_) => "minimum_quantity",
            LineError::VariantNotFound => "variant_not_found",
            LineError::PriceUnavailable => "price_unavailable",
            LineError::OutOfStock => "out_of_stock",
            LineError::AlreadyPlaced(_) => "already_placed",
            LineError::BundleSplit => "bundle_split",
        }
    }
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineError::ProductNotFound => write!(f, "Product not found"),
            LineError::Upstream(message) => write!(f, "{message}"),
            LineError::NotDropshipping => write!(f, "Not a dropshipping product"),
            LineError::MinimumQuantity(n) => write!(f, "Minimum product quantity needed: {n}"),
            LineError::VariantNotFound => write!(f, "Variant not found"),
            LineError::PriceUnavailable => write!(f, "Price not available"),
            LineError::OutOfStock => write!(f, "Out of stock"),
            LineError::AlreadyPlaced(trades) => {
                write!(f, "Item already placed: {}", trades.join(", "))
            }
            LineError::BundleSplit => write!(f, "Bundled products can't be split"),
        }
    }
}

impl Serialize for LineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One supplier product of a cart line, resolved for ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledLineItem {
    pub order_data_id: CartLineKey,
    pub line_title: String,
    pub source_id: String,
    pub title: String,
    pub supplier: Option<Supplier>,
    pub variant: Option<Variant>,
    pub quantity: u32,
    pub unit_price: Money,
    pub total_price: Money,

    /// What the customer paid for the whole cart line.
    pub paid_total: Money,

    pub processing_time: Option<u32>,
    pub error: Option<LineError>,
    pub is_bundle: bool,

    /// Share of the paid line total, set on bundle members only.
    pub split_price: Option<Money>,

    /// Sourcing costs more than the customer paid. Informational.
    pub cost_more: bool,

    pub image: Option<String>,
    pub shipping_method: Option<String>,
}

impl AssembledLineItem {
    /// Seeds an unresolved item for one sourced product of a cart line.
    pub fn seed(line: &CartLineSnapshot, product: &SourcedProduct) -> Self {
        Self {
            order_data_id: line.key.clone(),
            line_title: line.title.clone(),
            source_id: product.source_id.clone(),
            title: product.title.clone(),
            supplier: None,
            variant: None,
            quantity: product.quantity,
            unit_price: Money::zero(),
            total_price: Money::zero(),
            paid_total: line.line_total(),
            processing_time: None,
            error: None,
            is_bundle: line.is_bundle(),
            split_price: None,
            cost_more: false,
            image: None,
            shipping_method: line.shipping_method.clone(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn variant_id(&self) -> Option<&str> {
        self.variant.as_ref().map(|v| v.sku_id.as_str())
    }

    /// `source_id:variant_id`, matched against placed items.
    pub fn source_key(&self) -> Option<String> {
        self.variant_id()
            .map(|variant_id| format!("{}:{}", self.source_id, variant_id))
    }

    pub fn supplier_id(&self) -> Option<&str> {
        self.supplier.as_ref().map(|s| s.id.as_str())
    }

    /// Sets the unit price and the derived total.
    pub fn set_price(&mut self, unit_price: Money) {
        self.unit_price = unit_price;
        self.total_price = unit_price * self.quantity;
    }

    /// The share of the paid amount this item is compared against.
    pub fn customer_paid(&self) -> Money {
        self.split_price.unwrap_or(self.paid_total)
    }

    pub fn evaluate_cost(&mut self) {
        self.cost_more = self.is_ok() && self.total_price > self.customer_paid();
    }

    /// The persisted item for a submitted line, `None` if it cannot be ordered.
    pub fn to_placed_item(&self) -> Option<PlacedOrderItem> {
        if !self.is_ok() {
            return None;
        }
        let variant = self.variant.as_ref()?;
        let title = if self.title.is_empty() {
            self.line_title.clone()
        } else {
            self.title.clone()
        };

        Some(
            PlacedOrderItem::new(
                self.order_data_id.clone(),
                self.source_id.clone(),
                variant.sku_id.clone(),
                self.quantity,
                self.unit_price.amount(),
            )
            .with_title(title)
            .bundled(self.is_bundle),
        )
    }
}

/// Splits a paid amount across bundle members proportionally to their costs.
///
/// Shares are rounded to cents and the last member absorbs the remainder, so
/// the shares always add up to the rounded paid amount. Members split evenly
/// when no member has a cost.
pub fn apportion(paid: Money, costs: &[Money]) -> Vec<Money> {
    let Some((_, head)) = costs.split_last() else {
        return Vec::new();
    };

    let total: Money = costs.iter().copied().sum();
    let share = |cost: Money| {
        let exact = if total.is_zero() {
            paid.share(Money::from_cents(1), Money::from_cents(costs.len() as i64))
        } else {
            paid.share(cost, total)
        };
        exact.rounded()
    };

    let mut shares: Vec<Money> = head.iter().map(|c| share(*c)).collect();
    let assigned: Money = shares.iter().copied().sum();
    shares.push(paid.rounded() - assigned);
    shares
}

/// Why an assembled order is excluded from submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    NoShippingOption,
    ShippingQuote(String),
    /// Trailing order collecting every line that cannot be ordered.
    LineErrors,
}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderError::NoShippingOption => write!(f, "No shipping option selected"),
            OrderError::ShippingQuote(message) => write!(f, "Shipping quote failed: {message}"),
            OrderError::LineErrors => write!(f, "Some items can't be ordered"),
        }
    }
}

impl Serialize for OrderError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssemblyStatus {
    Ready,
    Error { error: OrderError },
    Placed { trade_id: String },
}

/// Items of one storefront order that ship together from one supplier order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledOrder {
    pub store_order_id: String,

    /// Index of this part when the storefront order is split.
    pub split: u32,

    pub shipping_address: ShippingAddress,
    pub shipping_options: Vec<ShippingOption>,
    pub items: Vec<AssembledLineItem>,
    pub currency: String,

    #[serde(flatten)]
    pub status: AssemblyStatus,
}

impl AssembledOrder {
    pub fn new(store_order_id: impl Into<String>, split: u32, address: ShippingAddress) -> Self {
        Self {
            store_order_id: store_order_id.into(),
            split,
            shipping_address: address,
            shipping_options: Vec::new(),
            items: Vec::new(),
            currency: "USD".to_string(),
            status: AssemblyStatus::Ready,
        }
    }

    /// `"{store_order_id}_{split}"`, the key callers select shipping by.
    pub fn selection_key(&self) -> String {
        format!("{}_{}", self.store_order_id, self.split)
    }

    pub fn ok_items(&self) -> impl Iterator<Item = &AssembledLineItem> {
        self.items.iter().filter(|i| i.is_ok())
    }

    /// Sum of the sourced totals of orderable items.
    pub fn product_total(&self) -> Money {
        self.ok_items().map(|i| i.total_price).sum()
    }

    pub fn selected_shipping(&self) -> Option<&ShippingOption> {
        let mut selected = self.shipping_options.iter().filter(|o| o.selected);
        match (selected.next(), selected.next()) {
            (Some(option), None) => Some(option),
            _ => None,
        }
    }

    pub fn shipping_fee(&self) -> Money {
        self.selected_shipping()
            .map(|o| o.fee)
            .unwrap_or_default()
    }

    pub fn total(&self) -> Money {
        self.product_total() + self.shipping_fee()
    }

    /// Longest processing time of orderable items, at least one day.
    pub fn processing_duration(&self) -> u32 {
        self.ok_items()
            .filter_map(|i| i.processing_time)
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Marks `code` as the only selected option. Returns false if no option has it.
    pub fn select_shipping(&mut self, code: &str) -> bool {
        if !self.shipping_options.iter().any(|o| o.vendor_code == code) {
            return false;
        }
        for option in &mut self.shipping_options {
            option.selected = option.vendor_code == code;
        }
        true
    }

    /// Ready, exactly one shipping option selected, and at least one orderable item.
    pub fn can_submit(&self) -> bool {
        self.status == AssemblyStatus::Ready
            && self.selected_shipping().is_some()
            && self.ok_items().next().is_some()
    }

    pub fn trade_id(&self) -> Option<&str> {
        match &self.status {
            AssemblyStatus::Placed { trade_id } => Some(trade_id),
            _ => None,
        }
    }
}

//! Canonical supplier catalog types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One quantity tier of a ladder.
///
/// `max_quantity` of `None` means the tier is unbounded (`-1` upstream).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderStep<T> {
    pub min_quantity: u32,
    pub max_quantity: Option<u32>,
    pub value: T,
}

impl<T> LadderStep<T> {
    pub fn contains(&self, quantity: u32) -> bool {
        quantity >= self.min_quantity && self.max_quantity.is_none_or(|max| quantity <= max)
    }
}

/// Tiered values keyed by purchase quantity, ordered by `min_quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ladder<T> {
    steps: Vec<LadderStep<T>>,
}

impl<T> Default for Ladder<T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<T> Ladder<T> {
    /// Creates a ladder, sorting the steps by minimum quantity.
    pub fn new(mut steps: Vec<LadderStep<T>>) -> Self {
        steps.sort_by_key(|s| s.min_quantity);
        Self { steps }
    }

    pub fn steps(&self) -> &[LadderStep<T>] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Selects the step whose range contains `quantity`.
    ///
    /// Quantities below the first step fall back to the first step, and
    /// quantities above a bounded last step fall back to the last step.
    pub fn step_for(&self, quantity: u32) -> Option<&LadderStep<T>> {
        self.steps
            .iter()
            .find(|s| s.contains(quantity))
            .or_else(|| match self.steps.first() {
                Some(first) if quantity < first.min_quantity => Some(first),
                _ => self.steps.last(),
            })
    }
}

/// Unit price tiers.
pub type PriceLadder = Ladder<Money>;

/// Processing days tiers.
pub type ProcessingLadder = Ladder<u32>;

impl PriceLadder {
    pub fn price_for(&self, quantity: u32) -> Option<Money> {
        self.step_for(quantity).map(|s| s.value)
    }
}

impl ProcessingLadder {
    pub fn days_for(&self, quantity: u32) -> Option<u32> {
        self.step_for(quantity).map(|s| s.value)
    }
}

/// The company selling a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
}

impl Supplier {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse: String,
    pub quantity: u32,
}

/// A purchasable attribute combination of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Supplier SKU id, the `variant_id` of placed items.
    pub sku_id: String,

    /// Human-readable combined title, e.g. `"Red / Large"`.
    pub title: String,

    /// Composite attribute key, e.g. `"14:200;5:100"`.
    pub sku: String,

    pub attribute_values: Vec<String>,
    pub price: PriceLadder,
    pub image: Option<String>,

    /// Empty means stock is not reported and therefore unconstrained.
    pub inventory_by_warehouse: Vec<WarehouseStock>,
}

impl Variant {
    /// Unit price for an aggregated order quantity.
    pub fn price_for(&self, quantity: u32) -> Option<Money> {
        self.price.price_for(quantity)
    }

    /// True when some warehouse can ship `quantity` on its own.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.inventory_by_warehouse.is_empty()
            || self
                .inventory_by_warehouse
                .iter()
                .any(|w| w.quantity >= quantity)
    }

    pub fn sku_tokens(&self) -> BTreeSet<String> {
        sku_tokens(&self.sku)
    }

    pub fn title_tokens(&self) -> BTreeSet<String> {
        title_tokens(&self.title)
    }
}

/// The variant recorded on a cart line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartVariant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl CartVariant {
    pub fn new(sku: Option<String>, title: Option<String>) -> Self {
        Self { sku, title }
    }

    pub fn from_title(title: impl Into<String>) -> Self {
        Self {
            sku: None,
            title: Some(title.into()),
        }
    }

    pub fn from_sku(sku: impl Into<String>) -> Self {
        Self {
            sku: Some(sku.into()),
            title: None,
        }
    }

    /// True when neither a sku nor a title was recorded.
    pub fn is_empty(&self) -> bool {
        self.sku.as_deref().is_none_or(|s| sku_tokens(s).is_empty())
            && self
                .title
                .as_deref()
                .is_none_or(|t| title_tokens(t).is_empty())
    }

    /// Full match on either signal: identical sku token sets, or every title
    /// token present in the variant's title.
    pub fn matches(&self, variant: &Variant) -> bool {
        let sku_match = self.sku.as_deref().is_some_and(|sku| {
            let tokens = sku_tokens(sku);
            !tokens.is_empty() && tokens == variant.sku_tokens()
        });

        let title_match = self.title.as_deref().is_some_and(|title| {
            let tokens = title_tokens(title);
            !tokens.is_empty() && tokens.is_subset(&variant.title_tokens())
        });

        sku_match || title_match
    }
}

fn sku_tokens(sku: &str) -> BTreeSet<String> {
    sku.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn title_tokens(title: &str) -> BTreeSet<String> {
    title
        .split('/')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty() && t != "default" && t != "default title")
        .collect()
}

/// A supplier product in canonical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub title: String,
    pub supplier: Supplier,
    pub is_orderable: bool,
    pub min_order_quantity: u32,
    pub currency: String,
    pub images: Vec<String>,

    /// Base price tiers, used by variants without their own ladder.
    pub price_ladder: PriceLadder,

    pub processing_times: ProcessingLadder,

    /// SKU id of the attribute-less base SKU, if the supplier reported one.
    pub base_sku_id: Option<String>,

    pub variants: Vec<Variant>,
}

impl CatalogProduct {
    /// Looks up a variant by its combined title.
    pub fn variant(&self, title: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.title == title)
    }

    /// Matches a cart line's recorded variant against this product.
    ///
    /// When neither side carries variant information a single `Default`
    /// variant is synthesized from the base price ladder.
    pub fn match_variant(&self, wanted: &CartVariant) -> Option<Variant> {
        if self.variants.is_empty() {
            return wanted.is_empty().then(|| self.default_variant());
        }

        if wanted.is_empty() {
            return match self.variants.as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            };
        }

        self.variants.iter().find(|v| wanted.matches(v)).cloned()
    }

    fn default_variant(&self) -> Variant {
        Variant {
            sku_id: self.base_sku_id.clone().unwrap_or_else(|| self.id.clone()),
            title: "Default".to_string(),
            sku: String::new(),
            attribute_values: Vec::new(),
            price: self.price_ladder.clone(),
            image: self.images.first().cloned(),
            inventory_by_warehouse: Vec::new(),
        }
    }

    /// Processing days for an aggregated order quantity.
    pub fn processing_time_for(&self, quantity: u32) -> Option<u32> {
        self.processing_times.days_for(quantity)
    }
}

/// Result of a catalog lookup for one id: the product, or the error that
/// replaced it when the supplier batch containing it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Found(Box<CatalogProduct>),
    Failed { id: String, error: String },
}

impl CatalogEntry {
    pub fn id(&self) -> &str {
        match self {
            CatalogEntry::Found(product) => &product.id,
            CatalogEntry::Failed { id, .. } => id,
        }
    }

    pub fn product(&self) -> Option<&CatalogProduct> {
        match self {
            CatalogEntry::Found(product) => Some(product),
            CatalogEntry::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CatalogEntry::Found(_) => None,
            CatalogEntry::Failed { error, .. } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(min: u32, max: Option<u32>, cents: i64) -> LadderStep<Money> {
        LadderStep {
            min_quantity: min,
            max_quantity: max,
            value: Money::from_cents(cents),
        }
    }

    fn variant(sku_id: &str, title: &str, sku: &str) -> Variant {
        Variant {
            sku_id: sku_id.to_string(),
            title: title.to_string(),
            sku: sku.to_string(),
            attribute_values: title.split(" / ").map(str::to_string).collect(),
            price: PriceLadder::new(vec![step(1, None, 500)]),
            image: None,
            inventory_by_warehouse: Vec::new(),
        }
    }

    fn product(variants: Vec<Variant>) -> CatalogProduct {
        CatalogProduct {
            id: "P1".to_string(),
            title: "Widget".to_string(),
            supplier: Supplier::new("C1", "Acme"),
            is_orderable: true,
            min_order_quantity: 1,
            currency: "USD".to_string(),
            images: vec!["https://img/main.jpg".to_string()],
            price_ladder: PriceLadder::new(vec![step(1, None, 700)]),
            processing_times: ProcessingLadder::default(),
            base_sku_id: Some("B1".to_string()),
            variants,
        }
    }

    #[test]
    fn price_ladder_selects_step_by_quantity() {
        let ladder = PriceLadder::new(vec![step(10, None, 800), step(1, Some(9), 1000)]);

        assert_eq!(ladder.price_for(1), Some(Money::from_cents(1000)));
        assert_eq!(ladder.price_for(9), Some(Money::from_cents(1000)));
        assert_eq!(ladder.price_for(12), Some(Money::from_cents(800)));
        assert_eq!(ladder.price_for(0), Some(Money::from_cents(1000)));
        assert_eq!(PriceLadder::default().price_for(5), None);
    }

    #[test]
    fn bounded_last_step_covers_larger_quantities() {
        let ladder = ProcessingLadder::new(vec![
            LadderStep {
                min_quantity: 1,
                max_quantity: Some(50),
                value: 3,
            },
            LadderStep {
                min_quantity: 51,
                max_quantity: Some(500),
                value: 7,
            },
        ]);

        assert_eq!(ladder.days_for(20), Some(3));
        assert_eq!(ladder.days_for(51), Some(7));
        assert_eq!(ladder.days_for(1000), Some(7));
    }

    #[test]
    fn stock_check() {
        let mut v = variant("S1", "Red", "1:1");
        assert!(v.has_stock_for(1000));

        v.inventory_by_warehouse = vec![
            WarehouseStock {
                warehouse: "CN".to_string(),
                quantity: 5,
            },
            WarehouseStock {
                warehouse: "US".to_string(),
                quantity: 8,
            },
        ];
        assert!(v.has_stock_for(8));
        assert!(!v.has_stock_for(9));
    }

    #[test]
    fn variant_match_by_sku_tokens_in_any_order() {
        let product = product(vec![
            variant("S1", "Red / Large", "14:200;5:100"),
            variant("S2", "Blue / Large", "14:201;5:100"),
        ]);

        let matched = product
            .match_variant(&CartVariant::from_sku("5:100;14:201"))
            .unwrap();
        assert_eq!(matched.sku_id, "S2");
    }

    #[test]
    fn variant_match_by_title_subset() {
        let product = product(vec![
            variant("S1", "Red / Large", "14:200;5:100"),
            variant("S2", "Blue / Large", "14:201;5:100"),
        ]);

        let matched = product
            .match_variant(&CartVariant::from_title("large / BLUE"))
            .unwrap();
        assert_eq!(matched.sku_id, "S2");

        assert!(
            product
                .match_variant(&CartVariant::from_title("Green"))
                .is_none()
        );
    }

    #[test]
    fn default_variant_is_synthesized_without_variant_info() {
        let product = product(Vec::new());

        let matched = product.match_variant(&CartVariant::default()).unwrap();
        assert_eq!(matched.title, "Default");
        assert_eq!(matched.sku_id, "B1");
        assert_eq!(matched.price_for(3), Some(Money::from_cents(700)));

        assert!(
            product
                .match_variant(&CartVariant::from_title("Red"))
                .is_none()
        );
    }

    #[test]
    fn single_variant_is_selected_when_cart_has_no_variant() {
        let product = product(vec![variant("S1", "Red", "1:1")]);
        let matched = product.match_variant(&CartVariant::default()).unwrap();
        assert_eq!(matched.sku_id, "S1");
    }

    #[test]
    fn catalog_entry_accessors() {
        let found = CatalogEntry::Found(Box::new(product(Vec::new())));
        let failed = CatalogEntry::Failed {
            id: "P2".to_string(),
            error: "ApiCallLimit".to_string(),
        };

        assert_eq!(found.id(), "P1");
        assert!(found.error().is_none());
        assert_eq!(failed.id(), "P2");
        assert_eq!(failed.error(), Some("ApiCallLimit"));
        assert!(failed.product().is_none());
    }
}

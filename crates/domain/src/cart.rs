//! Cart line snapshots awaiting sourcing.

use common::CartLineKey;
use serde::Deserialize;
use serde_json::Value;

use crate::{DomainError, catalog::CartVariant, money::Money, shipping::ShippingAddress};

/// One supplier product a cart line needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedProduct {
    pub source_id: String,
    pub title: String,

    /// Units per cart line unit (1 for simple lines).
    pub quantity: u32,

    pub variant: CartVariant,
}

impl SourcedProduct {
    pub fn new(source_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            source_id: source_id.into(),
            title: String::new(),
            quantity,
            variant: CartVariant::default(),
        }
    }

    pub fn with_variant(mut self, variant: CartVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Simple(SourcedProduct),
    Bundle(Vec<SourcedProduct>),
}

/// A storefront line item cached for sourcing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCartLine")]
pub struct CartLineSnapshot {
    pub key: CartLineKey,
    pub title: String,
    pub quantity: u32,

    /// Unit price the customer paid.
    pub total: Money,

    pub shipping_method: Option<String>,
    pub is_refunded: bool,
    pub shipping_address: ShippingAddress,
    pub kind: LineKind,
}

impl CartLineSnapshot {
    pub fn simple(key: CartLineKey, product: SourcedProduct, quantity: u32, total: Money) -> Self {
        Self {
            key,
            title: product.title.clone(),
            quantity,
            total,
            shipping_method: None,
            is_refunded: false,
            shipping_address: ShippingAddress::default(),
            kind: LineKind::Simple(product),
        }
    }

    pub fn bundle(
        key: CartLineKey,
        members: Vec<SourcedProduct>,
        quantity: u32,
        total: Money,
    ) -> Self {
        Self {
            key,
            title: String::new(),
            quantity,
            total,
            shipping_method: None,
            is_refunded: false,
            shipping_address: ShippingAddress::default(),
            kind: LineKind::Bundle(members),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_shipping_method(mut self, method: impl Into<String>) -> Self {
        self.shipping_method = Some(method.into());
        self
    }

    pub fn with_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = address;
        self
    }

    pub fn refunded(mut self) -> Self {
        self.is_refunded = true;
        self
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self.kind, LineKind::Bundle(_))
    }

    /// Storefront order the line belongs to.
    pub fn order_id(&self) -> &str {
        &self.key.order_id
    }

    /// What the customer paid for the whole line.
    pub fn line_total(&self) -> Money {
        self.total * self.quantity
    }

    /// Products to source, with quantities multiplied out by the line quantity.
    pub fn sourced_products(&self) -> Vec<SourcedProduct> {
        let expand = |product: &SourcedProduct| SourcedProduct {
            quantity: product.quantity.saturating_mul(self.quantity),
            ..product.clone()
        };

        match &self.kind {
            LineKind::Simple(product) => vec![expand(product)],
            LineKind::Bundle(members) => members.iter().map(expand).collect(),
        }
    }
}

#[derive(Deserialize)]
struct RawBundleMember {
    source_id: Value,
    #[serde(default)]
    title: String,
    #[serde(default = "one")]
    quantity: u32,
    #[serde(default)]
    variant: CartVariant,
}

#[derive(Deserialize)]
struct RawCartLine {
    id: String,
    #[serde(default)]
    title: String,
    quantity: u32,
    #[serde(default)]
    total: Value,
    #[serde(default)]
    shipping_method: Option<String>,
    #[serde(default)]
    is_refunded: bool,
    #[serde(default)]
    shipping_address: ShippingAddress,
    #[serde(default)]
    is_bundle: bool,
    #[serde(default)]
    source_id: Value,
    #[serde(default)]
    variant: CartVariant,
    #[serde(default)]
    products: Vec<RawBundleMember>,
}

fn one() -> u32 {
    1
}

fn source_id(value: &Value) -> Result<String, DomainError> {
    crate::normalize::json_id(value).ok_or_else(|| {
        DomainError::InvalidCartKey(format!("cart line without source_id: {value}"))
    })
}

impl TryFrom<RawCartLine> for CartLineSnapshot {
    type Error = DomainError;

    fn try_from(raw: RawCartLine) -> Result<Self, Self::Error> {
        let key = CartLineKey::parse(&raw.id)?;

        let kind = if raw.is_bundle {
            let members = raw
                .products
                .iter()
                .map(|member| {
                    Ok(SourcedProduct {
                        source_id: source_id(&member.source_id)?,
                        title: member.title.clone(),
                        quantity: member.quantity,
                        variant: member.variant.clone(),
                    })
                })
                .collect::<Result<Vec<_>, DomainError>>()?;
            LineKind::Bundle(members)
        } else {
            LineKind::Simple(SourcedProduct {
                source_id: source_id(&raw.source_id)?,
                title: raw.title.clone(),
                quantity: 1,
                variant: raw.variant,
            })
        };

        Ok(Self {
            key,
            title: raw.title,
            quantity: raw.quantity,
            total: Money::from_json(&raw.total).unwrap_or_default(),
            shipping_method: raw.shipping_method.filter(|m| !m.is_empty()),
            is_refunded: raw.is_refunded,
            shipping_address: raw.shipping_address,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn deserializes_simple_line() {
        let line: CartLineSnapshot = serde_json::from_value(json!({
            "id": "1_1001_5",
            "title": "T-Shirt",
            "quantity": 2,
            "total": "19.99",
            "shipping_method": "EMS",
            "shipping_address": {"country_code": "US", "zip": "10001"},
            "source_id": 1600123,
            "variant": {"title": "Red / Large"}
        }))
        .unwrap();

        assert_eq!(line.key, CartLineKey::new(1, "1001", "5"));
        assert_eq!(line.order_id(), "1001");
        assert_eq!(line.line_total(), Money::from_cents(3998));
        assert_eq!(line.shipping_method.as_deref(), Some("EMS"));
        assert!(!line.is_bundle());

        let products = line.sourced_products();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].source_id, "1600123");
        assert_eq!(products[0].quantity, 2);
        assert_eq!(products[0].variant.title.as_deref(), Some("Red / Large"));
    }

    #[test]
    fn bundle_members_are_multiplied_by_line_quantity() {
        let line: CartLineSnapshot = serde_json::from_value(json!({
            "id": "1_1001_6",
            "quantity": 3,
            "total": 30,
            "is_bundle": true,
            "products": [
                {"source_id": "P1", "quantity": 2},
                {"source_id": "P2", "variant": {"sku": "14:200"}}
            ]
        }))
        .unwrap();

        assert!(line.is_bundle());
        let quantities: Vec<_> = line
            .sourced_products()
            .iter()
            .map(|p| (p.source_id.clone(), p.quantity))
            .collect();
        assert_eq!(
            quantities,
            vec![("P1".to_string(), 6), ("P2".to_string(), 3)]
        );
    }

    #[test]
    fn rejects_bad_key_and_missing_source() {
        let bad_key = serde_json::from_value::<CartLineSnapshot>(json!({
            "id": "1001_5", "quantity": 1, "source_id": "P1"
        }));
        assert!(bad_key.is_err());

        let no_source = serde_json::from_value::<CartLineSnapshot>(json!({
            "id": "1_1001_5", "quantity": 1
        }));
        assert!(no_source.is_err());
    }
}

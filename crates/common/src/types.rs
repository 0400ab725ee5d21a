use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a persisted placed order.
///
/// Wraps a UUID to keep it apart from supplier trade ids and storefront
/// order ids, which are plain strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlacedOrderId(Uuid);

impl PlacedOrderId {
    /// Creates a new random placed order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a placed order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PlacedOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlacedOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PlacedOrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PlacedOrderId> for Uuid {
    fn from(id: PlacedOrderId) -> Self {
        id.0
    }
}

/// Storefront platform a store is connected through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    Shopify,
    #[serde(rename = "woo")]
    WooCommerce,
    #[serde(rename = "chq")]
    CommerceHq,
    #[serde(rename = "gkart")]
    GrooveKart,
    BigCommerce,
    Ebay,
}

impl StoreType {
    /// Returns the short platform code used in persisted rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreType::Shopify => "shopify",
            StoreType::WooCommerce => "woo",
            StoreType::CommerceHq => "chq",
            StoreType::GrooveKart => "gkart",
            StoreType::BigCommerce => "bigcommerce",
            StoreType::Ebay => "ebay",
        }
    }

    /// Parses a platform code as produced by [`StoreType::as_str`].
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "shopify" => Some(StoreType::Shopify),
            "woo" => Some(StoreType::WooCommerce),
            "chq" => Some(StoreType::CommerceHq),
            "gkart" => Some(StoreType::GrooveKart),
            "bigcommerce" => Some(StoreType::BigCommerce),
            "ebay" => Some(StoreType::Ebay),
            _ => None,
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A connected storefront: platform plus the store's numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreRef {
    pub store_type: StoreType,
    pub store_id: i64,
}

impl StoreRef {
    pub fn new(store_type: StoreType, store_id: i64) -> Self {
        Self {
            store_type,
            store_id,
        }
    }
}

impl std::fmt::Display for StoreRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.store_type, self.store_id)
    }
}

/// Error returned when a cart line id is not of the form `store_order_line`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid cart line id: {0}")]
pub struct InvalidCartLineKey(pub String);

/// Composite identifier of one cached cart line: `store_id_orderId_lineId`.
///
/// Ordering is by store, then order, then line, which keeps batches that
/// are iterated through ordered collections deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CartLineKey {
    pub store_id: i64,
    pub order_id: String,
    pub line_id: String,
}

impl CartLineKey {
    pub fn new(store_id: i64, order_id: impl Into<String>, line_id: impl Into<String>) -> Self {
        Self {
            store_id,
            order_id: order_id.into(),
            line_id: line_id.into(),
        }
    }

    /// Parses `store_id_orderId_lineId`. Exactly three non-empty parts are required.
    pub fn parse(raw: &str) -> Result<Self, InvalidCartLineKey> {
        let mut parts = raw.split('_');
        let (Some(store), Some(order), Some(line), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(InvalidCartLineKey(raw.to_string()));
        };

        if order.is_empty() || line.is_empty() {
            return Err(InvalidCartLineKey(raw.to_string()));
        }

        let store_id = store
            .parse::<i64>()
            .map_err(|_| InvalidCartLineKey(raw.to_string()))?;

        Ok(Self::new(store_id, order, line))
    }
}

impl std::fmt::Display for CartLineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.store_id, self.order_id, self.line_id)
    }
}

impl std::str::FromStr for CartLineKey {
    type Err = InvalidCartLineKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CartLineKey {
    type Error = InvalidCartLineKey;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CartLineKey> for String {
    fn from(key: CartLineKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placed_order_id_new_creates_unique_ids() {
        let id1 = PlacedOrderId::new();
        let id2 = PlacedOrderId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn placed_order_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = PlacedOrderId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn store_type_codes_roundtrip() {
        for store_type in [
            StoreType::Shopify,
            StoreType::WooCommerce,
            StoreType::CommerceHq,
            StoreType::GrooveKart,
            StoreType::BigCommerce,
            StoreType::Ebay,
        ] {
            assert_eq!(StoreType::parse(store_type.as_str()), Some(store_type));
        }
        assert_eq!(StoreType::parse("magento"), None);
    }

    #[test]
    fn store_type_serializes_as_code() {
        let json = serde_json::to_string(&StoreType::WooCommerce).unwrap();
        assert_eq!(json, "\"woo\"");
    }

    #[test]
    fn cart_line_key_parse() {
        let key = CartLineKey::parse("12_1001_55").unwrap();
        assert_eq!(key.store_id, 12);
        assert_eq!(key.order_id, "1001");
        assert_eq!(key.line_id, "55");
        assert_eq!(key.to_string(), "12_1001_55");
    }

    #[test]
    fn cart_line_key_rejects_malformed() {
        assert!(CartLineKey::parse("12_1001").is_err());
        assert!(CartLineKey::parse("12_1001_55_9").is_err());
        assert!(CartLineKey::parse("abc_1001_55").is_err());
        assert!(CartLineKey::parse("12__55").is_err());
    }

    #[test]
    fn cart_line_key_serializes_as_string() {
        let key = CartLineKey::new(3, "77", "8");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"3_77_8\"");
        let back: CartLineKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}

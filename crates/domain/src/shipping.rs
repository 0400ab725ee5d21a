//! Shipping addresses, carrier options and option merging.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::money::Money;

/// Destination of a storefront order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub phone: String,
}

impl ShippingAddress {
    pub fn new(country_code: impl Into<String>, zip: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            zip: zip.into(),
            ..Default::default()
        }
    }
}

/// A carrier offered by a supplier for a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub vendor_code: String,
    pub vendor_name: String,
    pub fee: Money,
    pub currency: String,
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl ShippingOption {
    pub fn new(vendor_code: impl Into<String>, fee: Money) -> Self {
        let vendor_code = vendor_code.into();
        Self {
            vendor_name: vendor_code.clone(),
            vendor_code,
            fee,
            currency: "USD".to_string(),
            delivery_time: None,
            selected: false,
        }
    }

    /// Parses one entry of a freight quote. Entries without a vendor code are skipped.
    pub fn from_freight(value: &Value) -> Option<Self> {
        let vendor_code = value.get("vendor_code")?.as_str()?.to_string();
        let fee = value.get("fee");
        Some(Self {
            vendor_name: value
                .get("vendor_name")
                .and_then(Value::as_str)
                .unwrap_or(vendor_code.as_str())
                .to_string(),
            fee: fee
                .and_then(|f| f.get("amount"))
                .and_then(Money::from_json)
                .unwrap_or_default(),
            currency: fee
                .and_then(|f| f.get("currency"))
                .and_then(Value::as_str)
                .unwrap_or("USD")
                .to_string(),
            delivery_time: value.get("delivery_time").and_then(|d| match d {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            selected: false,
            vendor_code,
        })
    }
}

/// Merges the options of several suppliers shipping into one order.
///
/// Keeps only vendor codes present in every group (or `similar_codes` when
/// given), sums their fees across groups, and flags `selected_code`.
/// Option order follows the first group.
pub fn filter_shippings(
    option_groups: &[Vec<ShippingOption>],
    selected_code: Option<&str>,
    similar_codes: Option<&[String]>,
) -> Vec<ShippingOption> {
    let Some(first) = option_groups.first() else {
        return Vec::new();
    };

    let shared = |code: &str| match similar_codes {
        Some(codes) => codes.iter().any(|c| c == code),
        None => option_groups
            .iter()
            .all(|group| group.iter().any(|o| o.vendor_code == code)),
    };

    first
        .iter()
        .filter(|option| shared(&option.vendor_code))
        .map(|option| {
            let fee = option_groups
                .iter()
                .filter_map(|group| group.iter().find(|o| o.vendor_code == option.vendor_code))
                .map(|o| o.fee)
                .sum();
            ShippingOption {
                fee,
                selected: selected_code == Some(option.vendor_code.as_str()),
                ..option.clone()
            }
        })
        .collect()
}

/// Vendor codes shared by two option lists.
pub fn shared_codes(a: &[ShippingOption], b: &[ShippingOption]) -> Vec<String> {
    a.iter()
        .filter(|o| b.iter().any(|p| p.vendor_code == o.vendor_code))
        .map(|o| o.vendor_code.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn option(code: &str, cents: i64) -> ShippingOption {
        ShippingOption::new(code, Money::from_cents(cents))
    }

    #[test]
    fn parses_freight_entry() {
        let option = ShippingOption::from_freight(&json!({
            "vendor_code": "CAINIAO_STANDARD",
            "vendor_name": "Cainiao Standard",
            "fee": {"amount": "3.50", "currency": "USD"},
            "delivery_time": 15
        }))
        .unwrap();

        assert_eq!(option.vendor_code, "CAINIAO_STANDARD");
        assert_eq!(option.vendor_name, "Cainiao Standard");
        assert_eq!(option.fee, Money::from_cents(350));
        assert_eq!(option.delivery_time.as_deref(), Some("15"));
        assert!(ShippingOption::from_freight(&json!({"fee": {"amount": 1}})).is_none());
    }

    #[test]
    fn filter_shippings_intersects_and_sums() {
        let groups = vec![
            vec![option("DHL", 1000), option("EMS", 500), option("UPS", 900)],
            vec![option("EMS", 300), option("DHL", 700)],
        ];

        let merged = filter_shippings(&groups, Some("EMS"), None);

        let codes: Vec<_> = merged.iter().map(|o| o.vendor_code.as_str()).collect();
        assert_eq!(codes, vec!["DHL", "EMS"]);
        assert_eq!(merged[0].fee, Money::from_cents(1700));
        assert_eq!(merged[1].fee, Money::from_cents(800));
        assert!(!merged[0].selected);
        assert!(merged[1].selected);
    }

    #[test]
    fn filter_shippings_with_presupplied_codes() {
        let groups = vec![
            vec![option("DHL", 1000), option("EMS", 500)],
            vec![option("EMS", 300)],
        ];
        let similar = vec!["DHL".to_string()];

        let merged = filter_shippings(&groups, None, Some(similar.as_slice()));
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].fee, Money::from_cents(1000));
    }

    #[test]
    fn filter_shippings_disjoint_groups() {
        let groups = vec![vec![option("DHL", 1000)], vec![option("EMS", 300)]];
        assert!(filter_shippings(&groups, None, None).is_empty());
        assert!(filter_shippings(&[], None, None).is_empty());
    }
}

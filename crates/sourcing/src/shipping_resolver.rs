//! Freight quotes per supplier, cached by request content.

use std::collections::BTreeMap;
use std::sync::Arc;

use domain::{ShippingAddress, ShippingOption};
use moka::future::Cache;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::{
    config::SourcingConfig,
    error::SourcingError,
    services::{SupplierClient, check_response, resources},
};

/// One product to quote shipping for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingRequestItem {
    pub product_id: String,
    pub quantity: u32,
    pub supplier_id: String,
}

impl ShippingRequestItem {
    pub fn new(
        product_id: impl Into<String>,
        quantity: u32,
        supplier_id: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            supplier_id: supplier_id.into(),
        }
    }
}

/// Options quoted by one supplier, or the supplier's error message.
pub type SupplierQuote = std::result::Result<Vec<ShippingOption>, String>;

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Quotes shipping per supplier with one freight call each.
pub struct ShippingResolver<C: SupplierClient> {
    client: C,
    cache: Cache<String, Arc<Vec<ShippingOption>>>,
}

impl<C: SupplierClient> ShippingResolver<C> {
    pub fn new(client: C, config: &SourcingConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.shipping_cache_ttl)
            .build();

        Self { client, cache }
    }

    /// Shipping options by supplier id. Items with zero quantity are skipped.
    #[tracing::instrument(skip(self, address, items), fields(country = %address.country_code, items = items.len()))]
    pub async fn get_order_shipping_costs(
        &self,
        address: &ShippingAddress,
        items: &[ShippingRequestItem],
        use_cache: bool,
    ) -> BTreeMap<String, SupplierQuote> {
        let mut by_supplier: BTreeMap<&str, BTreeMap<&str, u32>> = BTreeMap::new();
        for item in items.iter().filter(|i| i.quantity > 0) {
            *by_supplier
                .entry(item.supplier_id.as_str())
                .or_default()
                .entry(item.product_id.as_str())
                .or_default() += item.quantity;
        }

        let mut quotes = BTreeMap::new();
        for (supplier_id, products) in by_supplier {
            let product_list: Vec<Value> = products
                .iter()
                .map(|(product_id, quantity)| json!({"product_id": product_id, "quantity": quantity}))
                .collect();
            let params = json!({
                "company_id": supplier_id,
                "destination_country": address.country_code,
                "zip": address.zip,
                "product_list": product_list,
            });

            let quote = self.quote(params, use_cache).await;
            if let Err(ref error) = quote {
                tracing::warn!(supplier_id, error = %error, "Freight quote failed");
            }
            quotes.insert(supplier_id.to_string(), quote);
        }

        quotes
    }

    async fn quote(&self, params: Value, use_cache: bool) -> SupplierQuote {
        let key = sha256_hex(params.to_string().as_bytes());
        if use_cache && let Some(options) = self.cache.get(&key).await {
            return Ok(options.as_ref().clone());
        }

        let response = self
            .client
            .post(resources::FREIGHT_CALCULATE, params)
            .await
            .and_then(check_response)
            .map_err(|e| match e {
                SourcingError::Supplier { message, .. } => message,
                other => other.to_string(),
            })?;

        let options: Vec<ShippingOption> = response
            .get("values")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(ShippingOption::from_freight)
            .collect();

        self.cache.insert(key, Arc::new(options.clone())).await;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use domain::Money;

    use super::*;
    use crate::services::InMemorySupplierClient;

    fn freight(code: &str, amount: &str) -> Value {
        json!({"vendor_code": code, "vendor_name": code, "fee": {"amount": amount, "currency": "USD"}})
    }

    fn resolver(client: &InMemorySupplierClient) -> ShippingResolver<InMemorySupplierClient> {
        ShippingResolver::new(client.clone(), &SourcingConfig::default())
    }

    #[tokio::test]
    async fn one_call_per_supplier() {
        let client = InMemorySupplierClient::new();
        client.set_freight("C1", vec![freight("EMS", "3.00"), freight("DHL", "9.00")]);
        client.set_freight("C2", vec![freight("EMS", "4.00")]);
        let resolver = resolver(&client);
        let address = ShippingAddress::new("US", "10001");

        let quotes = resolver
            .get_order_shipping_costs(
                &address,
                &[
                    ShippingRequestItem::new("P1", 2, "C1"),
                    ShippingRequestItem::new("P2", 1, "C1"),
                    ShippingRequestItem::new("P3", 1, "C2"),
                    ShippingRequestItem::new("P4", 0, "C3"),
                ],
                true,
            )
            .await;

        assert_eq!(quotes.len(), 2);
        assert_eq!(client.call_count(resources::FREIGHT_CALCULATE), 2);
        let c1 = quotes["C1"].as_ref().unwrap();
        assert_eq!(c1.len(), 2);
        assert_eq!(c1[0].fee, Money::from_cents(300));
    }

    #[tokio::test]
    async fn identical_requests_hit_cache() {
        let client = InMemorySupplierClient::new();
        client.set_freight("C1", vec![freight("EMS", "3.00")]);
        let resolver = resolver(&client);
        let address = ShippingAddress::new("US", "10001");
        let items = [ShippingRequestItem::new("P1", 2, "C1")];

        resolver.get_order_shipping_costs(&address, &items, true).await;
        resolver.get_order_shipping_costs(&address, &items, true).await;
        assert_eq!(client.call_count(resources::FREIGHT_CALCULATE), 1);

        resolver.get_order_shipping_costs(&address, &items, false).await;
        assert_eq!(client.call_count(resources::FREIGHT_CALCULATE), 2);

        let other_zip = ShippingAddress::new("US", "94105");
        resolver.get_order_shipping_costs(&other_zip, &items, true).await;
        assert_eq!(client.call_count(resources::FREIGHT_CALCULATE), 3);
    }

    #[tokio::test]
    async fn supplier_error_is_reported_per_supplier() {
        let client = InMemorySupplierClient::new();
        client.set_freight("C1", vec![freight("EMS", "3.00")]);
        client.fail_freight("C2", "No route to destination");
        let resolver = resolver(&client);

        let quotes = resolver
            .get_order_shipping_costs(
                &ShippingAddress::new("BR", "01000"),
                &[
                    ShippingRequestItem::new("P1", 1, "C1"),
                    ShippingRequestItem::new("P2", 1, "C2"),
                ],
                true,
            )
            .await;

        assert!(quotes["C1"].is_ok());
        assert_eq!(quotes["C2"], Err("No route to destination".to_string()));
    }

    #[test]
    fn sha256_hex_is_stable() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}

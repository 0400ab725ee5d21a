//! Cached access to supplier products.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{CatalogEntry, CatalogProduct, normalize::json_id};
use moka::future::Cache;
use serde::Serialize;
use serde_json::{Value, json};

use crate::{
    config::SourcingConfig,
    services::{SupplierClient, check_response, resources},
};

/// A raw supplier product, or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawEntry {
    Found(Arc<Value>),
    Failed { id: String, error: String },
}

/// Fetches supplier products in fixed-size batches and caches the raw
/// payloads by product id for a short TTL.
///
/// A failed supplier batch turns each of its ids into an error entry; the
/// other batches are unaffected. Ids the supplier does not return at all
/// are omitted from the result.
pub struct CatalogCache<C: SupplierClient> {
    client: C,
    cache: Cache<String, Arc<Value>>,
    batch_size: usize,
}

impl<C: SupplierClient> CatalogCache<C> {
    pub fn new(client: C, config: &SourcingConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.product_cache_ttl)
            .build();

        Self {
            client,
            cache,
            batch_size: config.product_batch_size.max(1),
        }
    }

    /// Canonical products for `ids`, in first-requested order.
    ///
    /// Pass `use_cache = false` when prices must be current, e.g. right
    /// before a purchase.
    #[tracing::instrument(skip(self, ids))]
    pub async fn get_products(&self, ids: &[String], use_cache: bool) -> Vec<CatalogEntry> {
        self.lookup(ids, use_cache)
            .await
            .into_iter()
            .map(|(id, entry)| match entry {
                RawEntry::Found(raw) => match CatalogProduct::from_raw(&raw) {
                    Ok(product) => CatalogEntry::Found(Box::new(product)),
                    Err(e) => {
                        tracing::warn!(product_id = %id, error = %e, "Failed to normalize supplier product");
                        CatalogEntry::Failed {
                            id,
                            error: e.to_string(),
                        }
                    }
                },
                RawEntry::Failed { id, error } => CatalogEntry::Failed { id, error },
            })
            .collect()
    }

    /// Raw supplier payloads for `ids`, with the same batching and error entries.
    pub async fn get_raw_products(&self, ids: &[String], use_cache: bool) -> Vec<RawEntry> {
        self.lookup(ids, use_cache)
            .await
            .into_iter()
            .map(|(_, entry)| entry)
            .collect()
    }

    /// Entries keyed by the id they were requested under.
    async fn lookup(&self, ids: &[String], use_cache: bool) -> Vec<(String, RawEntry)> {
        let mut unique: Vec<&String> = Vec::with_capacity(ids.len());
        for id in ids {
            if !id.is_empty() && !unique.contains(&id) {
                unique.push(id);
            }
        }

        let mut found: HashMap<String, RawEntry> = HashMap::with_capacity(unique.len());
        let mut missing: Vec<String> = Vec::new();

        for id in &unique {
            let cached = if use_cache {
                self.cache.get(id.as_str()).await
            } else {
                None
            };
            match cached {
                Some(raw) => {
                    metrics::counter!("sourcing_catalog_cache_hits_total").increment(1);
                    found.insert((*id).clone(), RawEntry::Found(raw));
                }
                None => {
                    metrics::counter!("sourcing_catalog_cache_misses_total").increment(1);
                    missing.push((*id).clone());
                }
            }
        }

        for batch in missing.chunks(self.batch_size) {
            found.extend(self.fetch_batch(batch).await);
        }

        unique
            .into_iter()
            .filter_map(|id| found.remove(id).map(|entry| (id.clone(), entry)))
            .collect()
    }

    async fn fetch_batch(&self, batch: &[String]) -> Vec<(String, RawEntry)> {
        let params = json!({ "product_ids": batch.join(",") });
        let response = self
            .client
            .post(resources::PRODUCT_BATCH_GET, params)
            .await
            .and_then(check_response);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!("sourcing_supplier_batch_failures_total").increment(1);
                tracing::warn!(error = %e, batch = ?batch, "Supplier product batch failed");
                let error = match e {
                    crate::SourcingError::Supplier { message, .. } => message,
                    other => other.to_string(),
                };
                return batch
                    .iter()
                    .map(|id| {
                        (
                            id.clone(),
                            RawEntry::Failed {
                                id: id.clone(),
                                error: error.clone(),
                            },
                        )
                    })
                    .collect();
            }
        };

        let mut entries = Vec::with_capacity(batch.len());
        let products = response
            .get("products")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for raw in products {
            let Some(id) = raw.get("product_id").and_then(json_id) else {
                continue;
            };
            if !batch.contains(&id) {
                continue;
            }
            let raw = Arc::new(raw);
            self.cache.insert(id.clone(), raw.clone()).await;
            entries.push((id, RawEntry::Found(raw)));
        }

        entries
    }

    /// Drops a cached product so the next lookup hits the supplier.
    pub async fn invalidate(&self, product_id: &str) {
        self.cache.invalidate(product_id).await;
    }
}

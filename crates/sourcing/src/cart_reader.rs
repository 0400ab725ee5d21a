//! Loads cart line snapshots grouped by storefront order.

use std::collections::BTreeMap;

use common::CartLineKey;
use domain::CartLineSnapshot;

use crate::{
    error::{Result, SourcingError},
    services::CartSource,
};

/// Reads the cart lines of a batch.
///
/// Every requested line must exist; a missing one fails the whole read so
/// the caller can refresh. Refunded lines are dropped without error.
pub struct CartSnapshotReader<Ca: CartSource> {
    source: Ca,
}

impl<Ca: CartSource> CartSnapshotReader<Ca> {
    pub fn new(source: Ca) -> Self {
        Self { source }
    }

    /// Snapshots keyed by storefront order id, in requested order within each order.
    #[tracing::instrument(skip(self, keys), fields(lines = keys.len()))]
    pub async fn read(
        &self,
        keys: &[CartLineKey],
    ) -> Result<BTreeMap<String, Vec<CartLineSnapshot>>> {
        let mut unique: Vec<CartLineKey> = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(key) {
                unique.push(key.clone());
            }
        }

        let loaded = self.source.load(&unique).await?;

        let missing: Vec<String> = unique
            .iter()
            .filter(|key| !loaded.iter().any(|line| &line.key == *key))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(missing = ?missing, "Cart lines not found");
            return Err(SourcingError::UnresolvedCart(missing));
        }

        let mut orders: BTreeMap<String, Vec<CartLineSnapshot>> = BTreeMap::new();
        for key in &unique {
            let Some(line) = loaded.iter().find(|line| &line.key == key) else {
                continue;
            };
            if line.is_refunded {
                tracing::debug!(line = %line.key, "Skipping refunded line");
                continue;
            }
            orders
                .entry(line.order_id().to_string())
                .or_default()
                .push(line.clone());
        }

        Ok(orders)
    }
}

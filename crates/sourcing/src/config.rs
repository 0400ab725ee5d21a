//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Sourcing engine configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `SOURCING_PRODUCT_BATCH_SIZE` (default: `10`)
/// - `SOURCING_PRODUCT_CACHE_TTL_SECS` (default: `300`)
/// - `SOURCING_SHIPPING_CACHE_TTL_SECS` (default: `600`)
/// - `SOURCING_CACHE_CAPACITY` (default: `10000`)
/// - `SOURCING_SOURCE_TYPE` (default: `"alibaba"`)
#[derive(Debug, Clone)]
pub struct SourcingConfig {
    pub product_batch_size: usize,
    pub product_cache_ttl: Duration,
    pub shipping_cache_ttl: Duration,
    pub cache_capacity: u64,

    /// Source type reported to storefront tracking records.
    pub source_type: String,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl SourcingConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            product_batch_size: env_parse::<usize>("SOURCING_PRODUCT_BATCH_SIZE")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.product_batch_size),
            product_cache_ttl: env_parse("SOURCING_PRODUCT_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.product_cache_ttl),
            shipping_cache_ttl: env_parse("SOURCING_SHIPPING_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shipping_cache_ttl),
            cache_capacity: env_parse("SOURCING_CACHE_CAPACITY").unwrap_or(defaults.cache_capacity),
            source_type: std::env::var("SOURCING_SOURCE_TYPE").unwrap_or(defaults.source_type),
        }
    }
}

impl Default for SourcingConfig {
    fn default() -> Self {
        Self {
            product_batch_size: 10,
            product_cache_ttl: Duration::from_secs(300),
            shipping_cache_ttl: Duration::from_secs(600),
            cache_capacity: 10_000,
            source_type: "alibaba".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = SourcingConfig::default();
        assert_eq!(config.product_batch_size, 10);
        assert_eq!(config.product_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.shipping_cache_ttl, Duration::from_secs(600));
        assert_eq!(config.cache_capacity, 10_000);
        assert_eq!(config.source_type, "alibaba");
    }
}

//! Cart snapshot source trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::CartLineKey;
use domain::CartLineSnapshot;

use crate::error::{Result, SourcingError};

/// Storage of cart line snapshots cached by the storefront integrations.
#[async_trait]
pub trait CartSource: Send + Sync {
    /// Loads the snapshots for `keys`. Unknown keys are omitted from the result.
    async fn load(&self, keys: &[CartLineKey]) -> Result<Vec<CartLineSnapshot>>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    lines: HashMap<CartLineKey, CartLineSnapshot>,
    fail_on_load: bool,
}

/// In-memory cart source for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartSource {
    state: Arc<Mutex<InMemoryCartState>>,
}

impl InMemoryCartSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, InMemoryCartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, line: CartLineSnapshot) {
        self.state().lines.insert(line.key.clone(), line);
    }

    pub fn remove(&self, key: &CartLineKey) {
        self.state().lines.remove(key);
    }

    /// Configures the source to fail on every load.
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state().fail_on_load = fail;
    }

    pub fn line_count(&self) -> usize {
        self.state().lines.len()
    }
}

#[async_trait]
impl CartSource for InMemoryCartSource {
    async fn load(&self, keys: &[CartLineKey]) -> Result<Vec<CartLineSnapshot>> {
        let state = self.state();
        if state.fail_on_load {
            return Err(SourcingError::UnresolvedCart(
                keys.iter().map(ToString::to_string).collect(),
            ));
        }

        Ok(keys
            .iter()
            .filter_map(|key| state.lines.get(key).cloned())
            .collect())
    }
}

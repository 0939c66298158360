//! Result caches and the read-through facade the checkers share.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

/// A verdict cache keyed by A-label domain names.
///
/// Callers may back this with anything from a plain map to a remote store;
/// the trait is async so both shapes implement it uniformly. Entries are
/// write-once for the lifetime of a checker instance — there is no removal.
#[async_trait]
pub trait ResultCache<V: Clone + Send + Sync>: Send + Sync {
    async fn has(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<V>;
    async fn set(&self, key: &str, value: V);
}

/// The default in-memory cache used when the caller supplies none.
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V: Clone + Send + Sync> ResultCache<V> for MemoryCache<V> {
    async fn has(&self, key: &str) -> bool {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("cache read lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.contains_key(key)
    }

    async fn get(&self, key: &str) -> Option<V> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("cache read lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.get(key).cloned()
    }

    async fn set(&self, key: &str, value: V) {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("cache write lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.insert(key.to_string(), value);
    }
}

/// Read-through access: serve the cached entry or compute, store, and return.
///
/// `has` is authoritative — a key reported present is served from `get`
/// without recomputing (falling through only if the entry vanished between
/// the two calls). With no cache at all, the thunk runs unconditionally.
pub async fn get_or_compute<V, F, Fut>(
    cache: Option<&Arc<dyn ResultCache<V>>>,
    key: &str,
    compute: F,
) -> V
where
    V: Clone + Send + Sync,
    F: FnOnce() -> Fut,
    Fut: Future<Output = V>,
{
    let Some(cache) = cache else {
        return compute().await;
    };

    if cache.has(key).await {
        if let Some(value) = cache.get(key).await {
            debug!(key, "cache hit");
            return value;
        }
    }

    let value = compute().await;
    cache.set(key, value.clone()).await;
    value
}

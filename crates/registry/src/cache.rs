//! Bounded, time-expiring memoization of type definitions with
//! single-flight loading per identifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::debug;

use pidkeeper_core::{ResolveError, TypeDefinition, TypeRegistry};

/// Cache sizing and expiry knobs.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TypeCacheConfig {
    /// Maximum number of cached definitions.
    pub capacity: usize,
    /// Absolute time-to-live measured from the write, not from last read.
    #[serde(with = "ttl_seconds")]
    pub ttl: Duration,
}

impl Default for TypeCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

mod ttl_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

struct CachedType {
    definition: Arc<TypeDefinition>,
    written_at: Instant,
}

/// Resolves type identifiers through a [`TypeRegistry`], memoizing the
/// results.
///
/// Concurrency contract: at most one registry query is in flight per
/// distinct identifier; concurrent resolvers for the same uncached
/// identifier await that load instead of issuing their own. Lookups of
/// already-cached identifiers never wait on loads of unrelated ones, and
/// no lock is held across the registry call. Failed loads propagate to
/// every waiter and are not cached.
pub struct TypeCache {
    registry: Arc<dyn TypeRegistry>,
    config: TypeCacheConfig,
    entries: Mutex<HashMap<String, CachedType>>,
    loading: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TypeCache {
    pub fn new(registry: Arc<dyn TypeRegistry>, config: TypeCacheConfig) -> Self {
        Self {
            registry,
            config,
            entries: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_defaults(registry: Arc<dyn TypeRegistry>) -> Self {
        Self::new(registry, TypeCacheConfig::default())
    }

    /// Resolves the identifier, from cache or through the registry.
    pub async fn resolve(&self, identifier: &str) -> Result<Arc<TypeDefinition>, ResolveError> {
        if let Some(definition) = self.lookup(identifier) {
            return Ok(definition);
        }

        let guard = self.load_guard(identifier);
        let _held = guard.lock().await;

        // Another resolver may have completed the load while this one
        // waited for the guard.
        if let Some(definition) = self.lookup(identifier) {
            return Ok(definition);
        }

        debug!(identifier, "loading type definition into cache");
        let result = match self.registry.query_type_definition(identifier).await {
            Ok(definition) => {
                let definition = Arc::new(definition);
                self.store(identifier, Arc::clone(&definition));
                Ok(definition)
            }
            Err(error) => Err(error),
        };
        // The guard entry goes away only after the store, so a resolver
        // that grabs a fresh guard will find the cache filled.
        self.loading.lock().remove(identifier);
        result
    }

    /// Number of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries
            .values()
            .filter(|cached| cached.written_at.elapsed() < self.config.ttl)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, identifier: &str) -> Option<Arc<TypeDefinition>> {
        let mut entries = self.entries.lock();
        match entries.get(identifier) {
            Some(cached) if cached.written_at.elapsed() < self.config.ttl => {
                Some(Arc::clone(&cached.definition))
            }
            Some(_) => {
                entries.remove(identifier);
                debug!(identifier, "evicting expired type definition");
                None
            }
            None => None,
        }
    }

    fn store(&self, identifier: &str, definition: Arc<TypeDefinition>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.config.capacity {
            self.evict_one(&mut entries);
        }
        entries.insert(
            identifier.to_owned(),
            CachedType {
                definition,
                written_at: Instant::now(),
            },
        );
    }

    /// Drops expired entries; if none were expired, drops the oldest
    /// write. Eviction is silent towards callers.
    fn evict_one(&self, entries: &mut HashMap<String, CachedType>) {
        let before = entries.len();
        entries.retain(|identifier, cached| {
            let keep = cached.written_at.elapsed() < self.config.ttl;
            if !keep {
                debug!(identifier, "evicting expired type definition");
            }
            keep
        });
        if entries.len() < before {
            return;
        }
        let oldest = entries
            .iter()
            .min_by_key(|(_, cached)| cached.written_at)
            .map(|(identifier, _)| identifier.clone());
        if let Some(identifier) = oldest {
            debug!(%identifier, "evicting type definition, cache at capacity");
            entries.remove(&identifier);
        }
    }

    fn load_guard(&self, identifier: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.loading
                .lock()
                .entry(identifier.to_owned())
                .or_default(),
        )
    }
}

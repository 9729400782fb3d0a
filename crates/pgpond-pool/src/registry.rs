//! Pool registry: the named pools of one configuration scope
//!
//! A registry is populated during configuration assembly, finalized once
//! (running catalog warmup), and read-only from then on. Hosts with
//! virtual-host style configuration keep one registry per scope.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;

use pgpond_core::{PondError, Result};

use crate::pool::{CatalogCacheMode, PgPool, PoolSettings};


/// Hook invoked at configuration time to warm an external catalog cache.
///
/// Returns `None` on success or a human-readable error message; the
/// message aborts finalization of the scope. Result storage belongs to
/// the provider, not to pgpond.
pub trait CatalogWarmup: Send + Sync {
    /// Warm the catalog for one pool
    fn compute_catalog(&self, pool: &PgPool) -> Option<String>;
}

/// The named pools of one configuration scope, in registration order
#[derive(Default)]
pub struct PoolRegistry {
    pools: RwLock<IndexMap<String, Arc<PgPool>>>,
    finalized: AtomicBool,
}

impl PoolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pool from validated settings.
    ///
    /// Rejects registration on a finalized registry, invalid settings, and
    /// names already present in this scope (compared case-insensitively).
    pub fn register(&self, settings: PoolSettings) -> Result<Arc<PgPool>> {
        if self.finalized.load(Ordering::Acquire) {
            return Err(PondError::Configuration(format!(
                "cannot register pool '{}': registry is finalized",
                settings.name()
            )));
        }
        settings.validate()?;

        let key = settings.name().to_lowercase();
        let mut pools = self.pools.write();
        if pools.contains_key(&key) {
            return Err(PondError::DuplicateName(settings.name().to_string()));
        }

        tracing::debug!(pool = %settings.name(), "registering pool");
        let pool = Arc::new(PgPool::new(settings));
        pools.insert(key, pool.clone());
        Ok(pool)
    }

    /// Look up a pool by name, case-insensitively
    pub fn lookup(&self, name: &str) -> Option<Arc<PgPool>> {
        self.pools.read().get(&name.to_lowercase()).cloned()
    }

    /// All pools, in registration order
    pub fn pools(&self) -> Vec<Arc<PgPool>> {
        self.pools.read().values().cloned().collect()
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    /// Check if the registry has no pools
    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Check if the registry has been finalized
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Finalize the scope: run catalog warmup where configured, then
    /// freeze the registry.
    ///
    /// For every pool with catalog cache `enabled` or `required`, the
    /// warmup hook runs once; an error message from it is fatal to the
    /// scope. A `required` pool with no hook available is a configuration
    /// error naming the missing provider; an `enabled` pool without one
    /// just logs and moves on.
    #[tracing::instrument(skip(self, catalog))]
    pub fn finalize(&self, catalog: Option<&dyn CatalogWarmup>) -> Result<()> {
        for pool in self.pools() {
            let mode = pool.settings().catalog_cache();
            if mode == CatalogCacheMode::Disabled {
                continue;
            }
            match catalog {
                Some(provider) => {
                    tracing::debug!(pool = %pool.name(), "running catalog warmup");
                    if let Some(message) = provider.compute_catalog(&pool) {
                        return Err(PondError::Configuration(format!(
                            "catalog warmup failed for pool '{}': {}",
                            pool.name(),
                            message
                        )));
                    }
                }
                None if mode == CatalogCacheMode::Required => {
                    return Err(PondError::Configuration(format!(
                        "pool '{}' requires a catalog warmup provider, but none is registered",
                        pool.name()
                    )));
                }
                None => {
                    tracing::warn!(
                        pool = %pool.name(),
                        "catalog cache enabled but no warmup provider registered, skipping"
                    );
                }
            }
        }
        self.finalized.store(true, Ordering::Release);
        tracing::info!(pools = self.len(), "registry finalized");
        Ok(())
    }
}

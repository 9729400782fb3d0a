//! Per-pool configuration types
//!
//! These are the already-parsed values of one named pool definition. The
//! host server owns the configuration grammar; pgpond only consumes the
//! result and validates it at registration time.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pgpond_core::{PondError, Result};

/// Catalog-cache warmup mode for a pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogCacheMode {
    /// No warmup
    #[default]
    Disabled,
    /// Warm up when a provider is available
    Enabled,
    /// Warmup must run; configuration fails without a provider
    Required,
}

/// Configuration for one named connection pool
///
/// Immutable once registered. Sizing semantics: `pool_min` is the idle
/// floor the pool tries to keep, `pool_max_soft` is the retention threshold
/// above which released connections are shed, and `pool_max_hard` is the
/// absolute cap on concurrently acquired connections (0 disables pooling
/// for this name entirely).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Pool name, unique per registry scope (case-insensitive)
    name: String,
    /// Opaque backend conninfo string
    conn_info: String,
    /// Idle-connection floor
    #[serde(default)]
    pool_min: usize,
    /// Retention threshold for released connections
    #[serde(default)]
    pool_max_soft: usize,
    /// Cap on concurrently acquired connections
    #[serde(default = "default_pool_max_hard")]
    pool_max_hard: usize,
    /// Idle lifetime in milliseconds before eviction; 0 disables eviction
    #[serde(default)]
    pool_ttl_ms: u64,
    /// Directory for per-connection protocol trace files
    #[serde(default)]
    trace_directory: Option<PathBuf>,
    /// Catalog-cache warmup mode
    #[serde(default)]
    catalog_cache: CatalogCacheMode,
}

fn default_pool_max_hard() -> usize {
    1
}

impl PoolSettings {
    /// Create settings for a named pool with defaults:
    /// min 0, soft max 0, hard max 1, TTL disabled, no tracing, no catalog warmup.
    pub fn new(name: impl Into<String>, conn_info: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conn_info: conn_info.into(),
            pool_min: 0,
            pool_max_soft: 0,
            pool_max_hard: default_pool_max_hard(),
            pool_ttl_ms: 0,
            trace_directory: None,
            catalog_cache: CatalogCacheMode::Disabled,
        }
    }

    /// Set the idle-connection floor
    pub fn with_pool_min(mut self, min: usize) -> Self {
        self.pool_min = min;
        self
    }

    /// Set the soft maximum (retention threshold)
    pub fn with_pool_max_soft(mut self, max_soft: usize) -> Self {
        self.pool_max_soft = max_soft;
        self
    }

    /// Set the hard maximum (acquisition cap)
    pub fn with_pool_max_hard(mut self, max_hard: usize) -> Self {
        self.pool_max_hard = max_hard;
        self
    }

    /// Set the idle TTL in milliseconds (0 = no eviction)
    pub fn with_pool_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.pool_ttl_ms = ttl_ms;
        self
    }

    /// Enable protocol tracing into the given directory
    pub fn with_trace_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trace_directory = Some(dir.into());
        self
    }

    /// Set the catalog-cache warmup mode
    pub fn with_catalog_cache(mut self, mode: CatalogCacheMode) -> Self {
        self.catalog_cache = mode;
        self
    }

    /// Get the pool name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the backend conninfo string
    pub fn conn_info(&self) -> &str {
        &self.conn_info
    }

    /// Get the idle-connection floor
    pub fn pool_min(&self) -> usize {
        self.pool_min
    }

    /// Get the soft maximum
    pub fn pool_max_soft(&self) -> usize {
        self.pool_max_soft
    }

    /// Get the hard maximum
    pub fn pool_max_hard(&self) -> usize {
        self.pool_max_hard
    }

    /// Get the idle TTL as a Duration (zero = no eviction)
    pub fn pool_ttl(&self) -> Duration {
        Duration::from_millis(self.pool_ttl_ms)
    }

    /// Get the trace directory, if tracing is enabled
    pub fn trace_directory(&self) -> Option<&Path> {
        self.trace_directory.as_deref()
    }

    /// Get the catalog-cache warmup mode
    pub fn catalog_cache(&self) -> CatalogCacheMode {
        self.catalog_cache
    }

    /// Validate the settings.
    ///
    /// Configuration errors are fatal to assembling a registry scope, so
    /// everything checkable without touching the backend is checked here:
    /// non-empty name and conninfo, and `min <= soft <= hard` whenever the
    /// pool is enabled at all (`pool_max_hard >= 1`).
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PondError::Configuration("missing connection name".into()));
        }
        if self.conn_info.is_empty() {
            return Err(PondError::Configuration(format!(
                "pool '{}': conninfo must not be empty",
                self.name
            )));
        }
        if self.pool_max_hard >= 1 {
            if self.pool_min > self.pool_max_soft {
                return Err(PondError::Configuration(format!(
                    "pool '{}': pool_min ({}) cannot exceed pool_max_soft ({})",
                    self.name, self.pool_min, self.pool_max_soft
                )));
            }
            if self.pool_max_soft > self.pool_max_hard {
                return Err(PondError::Configuration(format!(
                    "pool '{}': pool_max_soft ({}) cannot exceed pool_max_hard ({})",
                    self.name, self.pool_max_soft, self.pool_max_hard
                )));
            }
        }
        Ok(())
    }
}

//! pgpond Pool - named, bounded connection pools for a host server
//!
//! This crate is the pooling core: the bounded resource-list engine, the
//! named pool containers with their acquire/release façade, the per-scope
//! registry, and the process-lifecycle entry points. Backends plug in
//! through the `ConnectionFactory`/`FactoryProvider` traits; see
//! `pgpond-postgres` for the PostgreSQL implementation.

pub mod engine;
mod lifecycle;
mod pool;
mod registry;

pub use engine::{PoolGauge, ResourceList};
pub use lifecycle::{FactoryProvider, ProcessPoolState, initialize_engines, teardown_engines};
pub use pool::{AcquireOutcome, CatalogCacheMode, ConnectionSlot, PgPool, PoolSettings, ReleaseOutcome};
pub use registry::{CatalogWarmup, PoolRegistry};

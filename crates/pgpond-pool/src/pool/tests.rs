//! Tests for pool settings and the acquire/release façade

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use pgpond_core::{Connection, ConnectionFactory, PondError, Result, SqlParam, TextRow};

use super::config::{CatalogCacheMode, PoolSettings};
use super::container::{AcquireOutcome, ConnectionSlot, PgPool, ReleaseOutcome};
use crate::engine::ResourceList;

/// Mock connection with controllable health
struct MockConnection {
    closed: AtomicBool,
    healthy: AtomicBool,
    reset_recovers: bool,
    resets: Arc<AtomicUsize>,
}

#[async_trait]
impl Connection for MockConnection {
    fn backend_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[SqlParam]) -> Result<u64> {
        Ok(0)
    }

    async fn query_text(&self, _sql: &str) -> Result<Vec<TextRow>> {
        Ok(Vec::new())
    }

    fn is_healthy(&self) -> bool {
        !self.is_closed() && self.healthy.load(Ordering::SeqCst)
    }

    async fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        if self.reset_recovers {
            self.healthy.store(true, Ordering::SeqCst);
            Ok(())
        } else {
            Err(PondError::Connection("mock reset failure".into()))
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn backend_pid(&self) -> Option<i32> {
        None
    }
}

/// Factory producing connections whose initial health is configurable
struct MockFactory {
    unhealthy: AtomicBool,
    reset_recovers: bool,
    resets: Arc<AtomicUsize>,
    destroyed: Arc<AtomicUsize>,
}

impl MockFactory {
    fn healthy() -> Self {
        Self {
            unhealthy: AtomicBool::new(false),
            reset_recovers: true,
            resets: Arc::new(AtomicUsize::new(0)),
            destroyed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn unhealthy(reset_recovers: bool) -> Self {
        Self {
            unhealthy: AtomicBool::new(true),
            reset_recovers,
            resets: Arc::new(AtomicUsize::new(0)),
            destroyed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ConnectionFactory for MockFactory {
    async fn construct(&self) -> Result<Arc<dyn Connection>> {
        Ok(Arc::new(MockConnection {
            closed: AtomicBool::new(false),
            healthy: AtomicBool::new(!self.unhealthy.load(Ordering::SeqCst)),
            reset_recovers: self.reset_recovers,
            resets: self.resets.clone(),
        }))
    }

    async fn destroy(&self, conn: Arc<dyn Connection>) {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        let _ = conn.close().await;
    }
}

async fn pool_with_engine(settings: PoolSettings, factory: Arc<MockFactory>) -> PgPool {
    let pool = PgPool::new(settings.clone());
    let engine = ResourceList::new(
        settings.pool_min(),
        settings.pool_max_soft(),
        settings.pool_max_hard(),
        settings.pool_ttl(),
        factory,
    )
    .await;
    pool.install_engine(Arc::new(engine));
    pool
}

fn settings(max_hard: usize) -> PoolSettings {
    PoolSettings::new("db1", "host=localhost dbname=test").with_pool_max_hard(max_hard)
}

// =============================================================================
// PoolSettings tests
// =============================================================================

#[test]
fn test_settings_defaults() {
    let settings = PoolSettings::new("db1", "host=localhost");
    assert_eq!(settings.name(), "db1");
    assert_eq!(settings.conn_info(), "host=localhost");
    assert_eq!(settings.pool_min(), 0);
    assert_eq!(settings.pool_max_soft(), 0);
    assert_eq!(settings.pool_max_hard(), 1);
    assert_eq!(settings.pool_ttl(), Duration::ZERO);
    assert!(settings.trace_directory().is_none());
    assert_eq!(settings.catalog_cache(), CatalogCacheMode::Disabled);
}

#[test]
fn test_settings_builder() {
    let settings = PoolSettings::new("db1", "host=localhost")
        .with_pool_min(1)
        .with_pool_max_soft(2)
        .with_pool_max_hard(3)
        .with_pool_ttl_ms(60_000)
        .with_trace_directory("/var/log/pgpond")
        .with_catalog_cache(CatalogCacheMode::Required);

    assert_eq!(settings.pool_min(), 1);
    assert_eq!(settings.pool_max_soft(), 2);
    assert_eq!(settings.pool_max_hard(), 3);
    assert_eq!(settings.pool_ttl(), Duration::from_secs(60));
    assert!(settings.trace_directory().is_some());
    assert_eq!(settings.catalog_cache(), CatalogCacheMode::Required);
}

#[test]
fn test_settings_validation() {
    assert!(PoolSettings::new("db1", "host=x").validate().is_ok());
    assert!(PoolSettings::new("", "host=x").validate().is_err());
    assert!(PoolSettings::new("db1", "").validate().is_err());

    let min_over_soft = PoolSettings::new("db1", "host=x")
        .with_pool_min(3)
        .with_pool_max_soft(2)
        .with_pool_max_hard(4);
    assert!(min_over_soft.validate().is_err());

    let soft_over_hard = PoolSettings::new("db1", "host=x")
        .with_pool_max_soft(5)
        .with_pool_max_hard(2);
    assert!(soft_over_hard.validate().is_err());

    // A disabled pool carries no sizing contract to check.
    let disabled = PoolSettings::new("db1", "host=x")
        .with_pool_min(7)
        .with_pool_max_hard(0);
    assert!(disabled.validate().is_ok());
}

#[test]
fn test_settings_serde_round_trip() {
    let settings = PoolSettings::new("db1", "host=localhost dbname=certs")
        .with_pool_min(1)
        .with_pool_max_soft(4)
        .with_pool_max_hard(8)
        .with_pool_ttl_ms(300_000)
        .with_catalog_cache(CatalogCacheMode::Enabled);

    let json = serde_json::to_string(&settings).expect("serialize");
    let decoded: PoolSettings = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(decoded.name(), "db1");
    assert_eq!(decoded.pool_min(), 1);
    assert_eq!(decoded.pool_max_soft(), 4);
    assert_eq!(decoded.pool_max_hard(), 8);
    assert_eq!(decoded.pool_ttl(), Duration::from_secs(300));
    assert_eq!(decoded.catalog_cache(), CatalogCacheMode::Enabled);
}

#[test]
fn test_settings_serde_defaults_apply() {
    let decoded: PoolSettings =
        serde_json::from_str(r#"{"name":"db1","conn_info":"host=x"}"#).expect("deserialize");
    assert_eq!(decoded.pool_max_hard(), 1);
    assert_eq!(decoded.pool_ttl(), Duration::ZERO);
    assert_eq!(decoded.catalog_cache(), CatalogCacheMode::Disabled);
}

// =============================================================================
// ConnectionSlot tests
// =============================================================================

#[test]
fn test_slot_starts_empty() {
    let slot = ConnectionSlot::new();
    assert!(!slot.is_occupied());
    assert!(slot.connection().is_none());
}

// =============================================================================
// Façade tests
// =============================================================================

#[tokio::test]
async fn test_acquire_and_release_round_trip() {
    let pool = pool_with_engine(settings(2), Arc::new(MockFactory::healthy())).await;
    let mut slot = ConnectionSlot::new();

    assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Acquired);
    assert!(slot.is_occupied());
    assert_eq!(pool.availability(), 50);

    assert_eq!(pool.release(&mut slot).await, ReleaseOutcome::Released);
    assert!(!slot.is_occupied());
    assert_eq!(pool.availability(), 100);
}

#[tokio::test]
async fn test_double_acquire_reports_already_acquired() {
    let pool = pool_with_engine(settings(2), Arc::new(MockFactory::healthy())).await;
    let mut slot = ConnectionSlot::new();

    assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Acquired);
    assert_eq!(
        pool.acquire(&mut slot).await,
        AcquireOutcome::AlreadyAcquired
    );
    // The held connection is untouched by the rejected call.
    assert!(slot.is_occupied());

    pool.release(&mut slot).await;
}

#[tokio::test]
async fn test_release_without_acquire_reports_bad() {
    let pool = pool_with_engine(settings(2), Arc::new(MockFactory::healthy())).await;
    let mut slot = ConnectionSlot::new();
    assert_eq!(pool.release(&mut slot).await, ReleaseOutcome::Bad);
}

#[tokio::test]
async fn test_acquire_without_engine_reports_unavailable() {
    let pool = PgPool::new(settings(2));
    let mut slot = ConnectionSlot::new();
    assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Unavailable);
    assert_eq!(pool.availability(), 0);
}

#[tokio::test]
async fn test_unhealthy_connection_recovers_with_single_reset() {
    let factory = Arc::new(MockFactory::unhealthy(true));
    let pool = pool_with_engine(settings(2), factory.clone()).await;
    let mut slot = ConnectionSlot::new();

    assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Acquired);
    assert_eq!(factory.resets.load(Ordering::SeqCst), 1);
    assert!(slot.connection().expect("slot holds connection").is_healthy());

    pool.release(&mut slot).await;
}

#[tokio::test]
async fn test_unhealthy_connection_failing_reset_reports_bad() {
    let factory = Arc::new(MockFactory::unhealthy(false));
    let pool = pool_with_engine(settings(1), factory.clone()).await;
    let mut slot = ConnectionSlot::new();

    assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Bad);
    assert!(!slot.is_occupied());
    assert_eq!(factory.resets.load(Ordering::SeqCst), 1);
    assert_eq!(factory.destroyed.load(Ordering::SeqCst), 1);

    // The discarded connection freed its slot; a healthy backend makes
    // the next acquire succeed even on a hard maximum of one.
    factory.unhealthy.store(false, Ordering::SeqCst);
    assert_eq!(
        pool.acquire_within(&mut slot, Duration::from_secs(1)).await,
        AcquireOutcome::Acquired
    );
    pool.release(&mut slot).await;
}

#[tokio::test]
async fn test_acquire_within_maps_timeout_to_unavailable() {
    let pool = pool_with_engine(settings(1), Arc::new(MockFactory::healthy())).await;
    let mut held = ConnectionSlot::new();
    assert_eq!(pool.acquire(&mut held).await, AcquireOutcome::Acquired);

    let mut slot = ConnectionSlot::new();
    assert_eq!(
        pool.acquire_within(&mut slot, Duration::from_millis(40)).await,
        AcquireOutcome::Unavailable
    );

    pool.release(&mut held).await;
}

#[tokio::test]
async fn test_availability_runs_full_range() {
    let pool = pool_with_engine(settings(4), Arc::new(MockFactory::healthy())).await;
    assert_eq!(pool.availability(), 100);

    let mut slots = Vec::new();
    for _ in 0..4 {
        let mut slot = ConnectionSlot::new();
        assert_eq!(pool.acquire(&mut slot).await, AcquireOutcome::Acquired);
        slots.push(slot);
    }
    assert_eq!(pool.availability(), 0);

    for mut slot in slots {
        pool.release(&mut slot).await;
    }
    assert_eq!(pool.availability(), 100);
}

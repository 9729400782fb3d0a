//! Named pool container and the acquire/release façade

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use pgpond_core::Connection;

use super::config::PoolSettings;
use crate::engine::ResourceList;

/// Result of an acquire attempt.
///
/// Every routine condition is a distinct variant; callers never see a
/// panic or an overloaded status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// A validated connection was placed in the caller's slot
    Acquired,
    /// The slot already holds a connection; release it first
    AlreadyAcquired,
    /// The pool has no engine, is exhausted, or could not open a connection
    Unavailable,
    /// The connection failed validation and its single reset attempt
    Bad,
}

/// Result of a release attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The connection was returned to the pool and the slot cleared
    Released,
    /// The slot held nothing to release
    Bad,
}

/// A caller's connection handle slot.
///
/// One slot per call site; at most one outstanding acquisition per slot.
/// This is caller discipline, not a pool-wide limit: a caller needing two
/// connections uses two slots.
#[derive(Default)]
pub struct ConnectionSlot {
    conn: Option<Arc<dyn Connection>>,
}

impl ConnectionSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether the slot currently holds a connection
    pub fn is_occupied(&self) -> bool {
        self.conn.is_some()
    }

    /// Get the held connection, if any
    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.conn.as_ref()
    }

    fn put(&mut self, conn: Arc<dyn Connection>) {
        self.conn = Some(conn);
    }

    fn take(&mut self) -> Option<Arc<dyn Connection>> {
        self.conn.take()
    }
}

/// A named, configured connection target with its bounded engine.
///
/// Created at configuration time; the engine slot stays empty until the
/// owning process runs engine initialization, and is cleared again at
/// teardown. A pool without an engine reports `Unavailable` for every
/// acquire.
pub struct PgPool {
    settings: PoolSettings,
    engine: RwLock<Option<Arc<ResourceList>>>,
}

impl PgPool {
    pub(crate) fn new(settings: PoolSettings) -> Self {
        Self {
            settings,
            engine: RwLock::new(None),
        }
    }

    /// Get the pool's configured name
    pub fn name(&self) -> &str {
        self.settings.name()
    }

    /// Get the pool's settings
    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Get the pool's engine, if one is installed
    pub fn engine(&self) -> Option<Arc<ResourceList>> {
        self.engine.read().clone()
    }

    pub(crate) fn install_engine(&self, engine: Arc<ResourceList>) {
        *self.engine.write() = Some(engine);
    }

    pub(crate) fn take_engine(&self) -> Option<Arc<ResourceList>> {
        self.engine.write().take()
    }

    /// Acquire a connection into the caller's slot.
    ///
    /// Suspends at the hard maximum until capacity frees up. The returned
    /// connection has passed a liveness check, with one in-place reset
    /// attempt spent on it if needed; a connection that stays unhealthy is
    /// destroyed and reported as `Bad`.
    pub async fn acquire(&self, slot: &mut ConnectionSlot) -> AcquireOutcome {
        if slot.is_occupied() {
            return AcquireOutcome::AlreadyAcquired;
        }
        let Some(engine) = self.engine() else {
            return AcquireOutcome::Unavailable;
        };
        match engine.acquire().await {
            Ok(conn) => self.validate_into(slot, &engine, conn).await,
            Err(e) => {
                tracing::debug!(pool = %self.name(), error = %e, "acquire failed");
                AcquireOutcome::Unavailable
            }
        }
    }

    /// Acquire with a caller-supplied deadline; an expired deadline is
    /// reported as `Unavailable`.
    pub async fn acquire_within(&self, slot: &mut ConnectionSlot, wait: Duration) -> AcquireOutcome {
        if slot.is_occupied() {
            return AcquireOutcome::AlreadyAcquired;
        }
        let Some(engine) = self.engine() else {
            return AcquireOutcome::Unavailable;
        };
        match engine.acquire_timeout(wait).await {
            Ok(conn) => self.validate_into(slot, &engine, conn).await,
            Err(e) => {
                tracing::debug!(pool = %self.name(), error = %e, "acquire failed");
                AcquireOutcome::Unavailable
            }
        }
    }

    /// Return the slot's connection to the pool.
    ///
    /// Reports `Bad` if the slot holds nothing. The slot is empty
    /// afterwards either way.
    pub async fn release(&self, slot: &mut ConnectionSlot) -> ReleaseOutcome {
        let Some(conn) = slot.take() else {
            return ReleaseOutcome::Bad;
        };
        match self.engine() {
            Some(engine) => engine.release(conn).await,
            // Engine torn down while the connection was out: it has already
            // been force-destroyed, there is nothing to return it to.
            None => drop(conn),
        }
        ReleaseOutcome::Released
    }

    /// Percentage (0..=100) of the hard maximum not currently acquired.
    ///
    /// An instantaneous, racy snapshot; treat it as advisory. A pool with
    /// no engine reports 0.
    pub fn availability(&self) -> u8 {
        match self.engine() {
            Some(engine) => engine.gauge().availability_percent(),
            None => 0,
        }
    }

    async fn validate_into(
        &self,
        slot: &mut ConnectionSlot,
        engine: &ResourceList,
        conn: Arc<dyn Connection>,
    ) -> AcquireOutcome {
        if !conn.is_healthy() {
            // One reset attempt per acquisition, never more.
            tracing::warn!(pool = %self.name(), "acquired connection unhealthy, resetting");
            let recovered = conn.reset().await.is_ok() && conn.is_healthy();
            if !recovered {
                tracing::warn!(pool = %self.name(), "reset failed, discarding connection");
                engine.invalidate(conn).await;
                return AcquireOutcome::Bad;
            }
        }
        slot.put(conn);
        AcquireOutcome::Acquired
    }
}

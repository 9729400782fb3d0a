//! Bounded resource list implementation

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Semaphore;

use pgpond_core::{Connection, ConnectionFactory, PondError, Result};

use super::gauge::PoolGauge;

/// Idle-set entry with its last-used timestamp
struct IdleEntry {
    conn: Arc<dyn Connection>,
    last_used: Instant,
}

impl IdleEntry {
    fn new(conn: Arc<dyn Connection>) -> Self {
        Self {
            conn,
            last_used: Instant::now(),
        }
    }

    fn expired(&self, ttl: Duration) -> bool {
        !ttl.is_zero() && self.last_used.elapsed() > ttl
    }
}

/// Engine bookkeeping, guarded by one mutex.
///
/// The critical section covers only these collections; connection
/// construction and destruction always run outside the lock.
struct ListState {
    /// Idle connections; newest at the back, so `pop_back` is LIFO reuse
    /// and `pop_front` drops the oldest first during TTL sweeps.
    idle: VecDeque<IdleEntry>,
    /// Connections currently held by callers, retained so shutdown can
    /// force-destroy them.
    acquired: Vec<Arc<dyn Connection>>,
}

/// A bounded list of reusable connections.
///
/// One instance per pool per process, shared by every thread of that
/// process. Enforces the sizing contract:
///
/// - at most `max_hard` connections acquired concurrently; an acquire at
///   the cap suspends until a release or destroy frees capacity
/// - released connections are retained while the total stays within
///   `max_soft` (or the idle set is below `min`), otherwise destroyed
/// - idle connections older than `ttl` are evicted opportunistically on
///   acquire and release, never shrinking the idle set below `min`
pub struct ResourceList {
    min: usize,
    max_soft: usize,
    max_hard: usize,
    ttl: Duration,
    factory: Arc<dyn ConnectionFactory>,
    /// Admission control: one permit per concurrently acquired connection
    semaphore: Arc<Semaphore>,
    state: Mutex<ListState>,
    shutdown: AtomicBool,
}

impl ResourceList {
    /// Create a resource list and pre-populate it with up to `min` idle
    /// connections.
    ///
    /// Pre-population is best-effort: a backend that is down at process
    /// start leaves a smaller idle set, and the list fills back up on
    /// demand.
    ///
    /// # Panics
    ///
    /// Panics if `max_hard` is 0; pools with a hard maximum of 0 must not
    /// get an engine at all.
    pub async fn new(
        min: usize,
        max_soft: usize,
        max_hard: usize,
        ttl: Duration,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        assert!(max_hard >= 1, "max_hard must be at least 1, got {max_hard}");

        let list = Self {
            min,
            max_soft,
            max_hard,
            ttl,
            factory,
            semaphore: Arc::new(Semaphore::new(max_hard)),
            state: Mutex::new(ListState {
                idle: VecDeque::with_capacity(max_hard),
                acquired: Vec::with_capacity(max_hard),
            }),
            shutdown: AtomicBool::new(false),
        };

        for _ in 0..min {
            match list.factory.construct().await {
                Ok(conn) => list.state.lock().idle.push_back(IdleEntry::new(conn)),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to pre-populate pool connection");
                    break;
                }
            }
        }

        list
    }

    /// Acquire a connection, suspending at the hard maximum until one is
    /// released or destroyed.
    ///
    /// There is no built-in deadline; callers wanting a bounded wait use
    /// [`acquire_timeout`](Self::acquire_timeout). Dropping the returned
    /// future while it is suspended releases its wait registration.
    pub async fn acquire(&self) -> Result<Arc<dyn Connection>> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(PondError::Exhausted("resource list is shut down".into()));
        }

        self.sweep_expired().await;

        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PondError::Exhausted("resource list is shut down".into()))?;

        // Most-recently-released first: keeps the working set small and
        // lets the TTL sweep retire the cold tail.
        let reused = {
            let mut state = self.state.lock();
            if self.shutdown.load(Ordering::Acquire) {
                return Err(PondError::Exhausted("resource list is shut down".into()));
            }
            let conn = state.idle.pop_back().map(|entry| entry.conn);
            if let Some(conn) = &conn {
                state.acquired.push(conn.clone());
            }
            conn
        };

        if let Some(conn) = reused {
            permit.forget();
            return Ok(conn);
        }

        // Nothing idle: open a new connection. This may block on network
        // I/O for a while, so it happens outside the bookkeeping lock with
        // the permit held to keep the hard cap exact.
        match self.factory.construct().await {
            Ok(conn) => {
                {
                    let mut state = self.state.lock();
                    if self.shutdown.load(Ordering::Acquire) {
                        drop(state);
                        drop(permit);
                        self.factory.destroy(conn).await;
                        return Err(PondError::Exhausted("resource list is shut down".into()));
                    }
                    state.acquired.push(conn.clone());
                }
                permit.forget();
                Ok(conn)
            }
            Err(e) => {
                drop(permit);
                Err(e)
            }
        }
    }

    /// Acquire with a caller-supplied deadline.
    ///
    /// An expired deadline reports `Timeout`; the façade treats it the
    /// same as an exhausted pool.
    pub async fn acquire_timeout(&self, wait: Duration) -> Result<Arc<dyn Connection>> {
        match tokio::time::timeout(wait, self.acquire()).await {
            Ok(result) => result,
            Err(_) => Err(PondError::Timeout(format!(
                "no connection became available within {wait:?}"
            ))),
        }
    }

    /// Return a connection to the list.
    ///
    /// Retained in the idle set (timestamp refreshed) while the total count
    /// including this connection stays within `max_soft`, or while the idle
    /// set is below `min`; otherwise destroyed.
    pub async fn release(&self, conn: Arc<dyn Connection>) {
        let retained = {
            let mut state = self.state.lock();
            Self::remove_acquired(&mut state.acquired, &conn);
            if self.shutdown.load(Ordering::Acquire) {
                false
            } else {
                let total = state.idle.len() + state.acquired.len() + 1;
                let retained = total <= self.max_soft || state.idle.len() < self.min;
                if retained {
                    state.idle.push_back(IdleEntry::new(conn.clone()));
                }
                retained
            }
        };

        // Free the capacity before the (possibly slow) destroys below, so
        // a suspended acquire can proceed immediately.
        self.semaphore.add_permits(1);

        if !retained {
            self.factory.destroy(conn).await;
        }
        self.sweep_expired().await;
    }

    /// Destroy a connection instead of returning it to the idle set.
    ///
    /// Used for connections that failed validation and recovery; the
    /// capacity they held is freed.
    pub async fn invalidate(&self, conn: Arc<dyn Connection>) {
        {
            let mut state = self.state.lock();
            Self::remove_acquired(&mut state.acquired, &conn);
        }
        self.semaphore.add_permits(1);
        self.factory.destroy(conn).await;
    }

    /// Destroy every idle and acquired connection and refuse further
    /// acquires.
    ///
    /// This is process teardown, not a normal operation: callers still
    /// holding a connection lose it, and suspended acquires fail with
    /// `Exhausted`.
    pub async fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        self.semaphore.close();

        let (idle, acquired) = {
            let mut state = self.state.lock();
            (
                state.idle.drain(..).collect::<Vec<_>>(),
                state.acquired.drain(..).collect::<Vec<_>>(),
            )
        };

        for entry in idle {
            self.factory.destroy(entry.conn).await;
        }
        if !acquired.is_empty() {
            tracing::warn!(
                count = acquired.len(),
                "force-destroying connections still acquired at shutdown"
            );
        }
        for conn in acquired {
            self.factory.destroy(conn).await;
        }
    }

    /// Number of connections currently held by callers
    pub fn acquired_count(&self) -> usize {
        self.state.lock().acquired.len()
    }

    /// Number of idle connections
    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Hard maximum this list was created with
    pub fn max_hard(&self) -> usize {
        self.max_hard
    }

    /// Snapshot of the list's current occupancy
    pub fn gauge(&self) -> PoolGauge {
        let state = self.state.lock();
        PoolGauge::new(state.idle.len(), state.acquired.len(), self.max_hard)
    }

    /// Evict idle connections past their TTL, oldest first, keeping at
    /// least `min` idle entries. Destruction runs outside the lock.
    async fn sweep_expired(&self) {
        if self.ttl.is_zero() {
            return;
        }
        let expired = {
            let mut state = self.state.lock();
            let mut expired = Vec::new();
            while state.idle.len() > self.min
                && state.idle.front().is_some_and(|e| e.expired(self.ttl))
            {
                if let Some(entry) = state.idle.pop_front() {
                    expired.push(entry.conn);
                }
            }
            expired
        };
        for conn in expired {
            tracing::debug!("evicting idle connection past its TTL");
            self.factory.destroy(conn).await;
        }
    }

    fn remove_acquired(acquired: &mut Vec<Arc<dyn Connection>>, conn: &Arc<dyn Connection>) {
        if let Some(pos) = acquired.iter().position(|c| Arc::ptr_eq(c, conn)) {
            acquired.swap_remove(pos);
        }
    }
}

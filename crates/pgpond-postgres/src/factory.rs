//! Connection factories for PostgreSQL pools

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use pgpond_core::{Connection, ConnectionFactory, PondError, Result};
use pgpond_pool::{FactoryProvider, PoolSettings};

use crate::connection::PgConnection;
use crate::trace::{TraceSink, TracedConnection};

/// Factory opening PostgreSQL connections for one pool.
///
/// The conninfo is validated once at creation so a typo fails the
/// configuration phase instead of every acquire.
pub struct PgConnectionFactory {
    conn_info: String,
    trace_dir: Option<PathBuf>,
}

impl PgConnectionFactory {
    /// Create a factory for the given conninfo string
    pub fn new(conn_info: impl Into<String>) -> Result<Self> {
        let conn_info = conn_info.into();
        tokio_postgres::Config::from_str(&conn_info)
            .map_err(|e| PondError::Configuration(format!("invalid conninfo: {e}")))?;
        Ok(Self {
            conn_info,
            trace_dir: None,
        })
    }

    /// Mirror each constructed connection's traffic into a trace file
    /// under `dir`
    pub fn with_trace_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.trace_dir = Some(dir.into());
        self
    }
}

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn construct(&self) -> Result<Arc<dyn Connection>> {
        let conn: Arc<dyn Connection> = Arc::new(PgConnection::connect(&self.conn_info).await?);
        match &self.trace_dir {
            None => Ok(conn),
            Some(dir) => attach_trace(conn, dir).await,
        }
    }
}

/// Wrap a freshly opened connection with a trace sink.
///
/// If the sink cannot be opened the connection is closed before the error
/// returns, so a misconfigured trace directory never leaks backend
/// sessions.
pub(crate) async fn attach_trace(
    conn: Arc<dyn Connection>,
    dir: &Path,
) -> Result<Arc<dyn Connection>> {
    let backend_pid = conn.backend_pid().unwrap_or(0);
    match TraceSink::open(dir, backend_pid) {
        Ok(sink) => Ok(Arc::new(TracedConnection::new(conn, sink))),
        Err(e) => {
            tracing::error!(error = %e, dir = ?dir, "failed to open trace sink, closing connection");
            if let Err(close_err) = conn.close().await {
                tracing::debug!(error = %close_err, "error closing connection after trace failure");
            }
            Err(e)
        }
    }
}

/// Provider wiring PostgreSQL factories into pool engine initialization.
///
/// Picks the traced or plain construction path per pool, depending on
/// whether the pool's settings carry a trace directory.
#[derive(Default)]
pub struct PgFactoryProvider;

impl PgFactoryProvider {
    /// Create a provider
    pub fn new() -> Self {
        Self
    }
}

impl FactoryProvider for PgFactoryProvider {
    fn factory_for(&self, settings: &PoolSettings) -> Result<Arc<dyn ConnectionFactory>> {
        let mut factory = PgConnectionFactory::new(settings.conn_info())?;
        if let Some(dir) = settings.trace_directory() {
            factory = factory.with_trace_directory(dir);
        }
        Ok(Arc::new(factory))
    }
}

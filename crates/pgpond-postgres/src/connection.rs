//! PostgreSQL connection implementation

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};

use pgpond_core::{Connection, PondError, Result, SqlParam, TextRow};

use crate::params;
use crate::tls;

fn map_postgres_error(error: tokio_postgres::Error) -> PondError {
    match error.as_db_error() {
        Some(db_error) => {
            let mut message = db_error.message().to_string();
            if let Some(detail) = db_error.detail()
                && !detail.trim().is_empty()
            {
                message.push_str(&format!(" (detail: {detail})"));
            }
            if let Some(hint) = db_error.hint()
                && !hint.trim().is_empty()
            {
                message.push_str(&format!(" (hint: {hint})"));
            }
            PondError::Query(format!("{} (code: {})", message, db_error.code().code()))
        }
        None => PondError::Connection(error.to_string()),
    }
}

/// A live PostgreSQL session.
///
/// The client sits behind a lock so `reset` can swap in a fresh session
/// while the handle (and its pool bookkeeping) stays the same; in-flight
/// operations on the old session finish against their own `Arc` and the
/// old driver task ends when the last one drops it.
pub struct PgConnection {
    config: Config,
    client: RwLock<Option<Arc<Client>>>,
    backend_pid: AtomicI32,
    closed: AtomicBool,
}

impl PgConnection {
    /// Open a connection from an opaque conninfo string.
    #[tracing::instrument(skip(conn_info))]
    pub async fn connect(conn_info: &str) -> Result<Self> {
        let config = Config::from_str(conn_info)
            .map_err(|e| PondError::Configuration(format!("invalid conninfo: {e}")))?;
        tracing::debug!("connecting to PostgreSQL backend");
        let (client, backend_pid) = open_client(&config).await?;
        tracing::info!(backend_pid, "PostgreSQL connection established");
        Ok(Self {
            config,
            client: RwLock::new(Some(Arc::new(client))),
            backend_pid: AtomicI32::new(backend_pid),
            closed: AtomicBool::new(false),
        })
    }

    fn client(&self) -> Result<Arc<Client>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PondError::Connection("connection is closed".into()));
        }
        self.client
            .read()
            .clone()
            .ok_or_else(|| PondError::Connection("connection is closed".into()))
    }
}

#[async_trait]
impl Connection for PgConnection {
    fn backend_name(&self) -> &str {
        "postgresql"
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let client = self.client()?;
        let wrapped = params::wrap(params);
        let refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> = wrapped
            .iter()
            .map(|p| p as &(dyn tokio_postgres::types::ToSql + Sync))
            .collect();
        client.execute(sql, &refs).await.map_err(map_postgres_error)
    }

    async fn query_text(&self, sql: &str) -> Result<Vec<TextRow>> {
        let client = self.client()?;
        let messages = client.simple_query(sql).await.map_err(map_postgres_error)?;
        let mut rows = Vec::new();
        for message in messages {
            if let SimpleQueryMessage::Row(row) = message {
                rows.push(TextRow {
                    columns: row.columns().iter().map(|c| c.name().to_string()).collect(),
                    values: (0..row.len()).map(|i| row.get(i).map(str::to_string)).collect(),
                });
            }
        }
        Ok(rows)
    }

    fn is_healthy(&self) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }
        self.client.read().as_ref().is_some_and(|c| !c.is_closed())
    }

    async fn reset(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PondError::Connection(
                "cannot reset a closed connection".into(),
            ));
        }
        tracing::info!("resetting PostgreSQL connection");
        let (client, backend_pid) = open_client(&self.config).await?;
        *self.client.write() = Some(Arc::new(client));
        self.backend_pid.store(backend_pid, Ordering::Release);
        tracing::info!(backend_pid, "PostgreSQL connection re-established");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Dropping the client ends the session; the driver task exits on
        // its own once the socket closes.
        self.client.write().take();
        tracing::debug!("PostgreSQL connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn backend_pid(&self) -> Option<i32> {
        match self.backend_pid.load(Ordering::Acquire) {
            0 => None,
            pid => Some(pid),
        }
    }
}

/// Open a client for `config` and fetch its backend session id.
async fn open_client(config: &Config) -> Result<(Client, i32)> {
    let client = match tls::connector_for(config)? {
        Some(tls) => {
            let (client, connection) = config
                .connect(tls)
                .await
                .map_err(map_postgres_error)?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!(error = %e, "postgres connection task ended with error");
                }
            });
            client
        }
        None => {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(map_postgres_error)?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!(error = %e, "postgres connection task ended with error");
                }
            });
            client
        }
    };

    let row = client
        .query_one("SELECT pg_backend_pid()", &[])
        .await
        .map_err(map_postgres_error)?;
    Ok((client, row.get(0)))
}

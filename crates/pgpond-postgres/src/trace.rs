//! Protocol tracing to a per-connection file
//!
//! When a pool has a trace directory configured, every connection it opens
//! is wrapped in [`TracedConnection`], which mirrors the traffic on that
//! connection to `<dir>/<host_pid>_<backend_pid>.trc` for the connection's
//! lifetime. Tracing is a construction-time decorator; the pooling engine
//! never knows whether a connection is traced.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;

use pgpond_core::{Connection, Result, SqlParam, TextRow};

/// A per-connection trace file.
///
/// Named after the host process id and the backend session id, so traces
/// from many worker processes sharing one directory never collide.
pub struct TraceSink {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl TraceSink {
    /// Create the trace file for a connection.
    ///
    /// Fails if the directory does not exist or is not writable; the
    /// caller decides what happens to the connection in that case.
    pub fn open(dir: &Path, backend_pid: i32) -> Result<Self> {
        let path = dir.join(format!("{}_{}.trc", std::process::id(), backend_pid));
        let file = std::fs::File::create(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the trace file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line to the trace file.
    ///
    /// Write failures are logged and swallowed; a full disk must not take
    /// the connection down with it.
    pub fn record(&self, line: &str) {
        let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{stamp}  {line}") {
            tracing::debug!(error = %e, path = ?self.path, "trace write failed");
        }
    }
}

/// Decorator mirroring a connection's traffic to a [`TraceSink`]
pub struct TracedConnection {
    inner: Arc<dyn Connection>,
    sink: TraceSink,
}

impl TracedConnection {
    /// Wrap a connection, recording the attachment
    pub fn new(inner: Arc<dyn Connection>, sink: TraceSink) -> Self {
        sink.record(&format!(
            "attach  backend={} backend_pid={}",
            inner.backend_name(),
            inner.backend_pid().unwrap_or(0)
        ));
        Self { inner, sink }
    }

    /// Path of the trace file this connection mirrors to
    pub fn trace_path(&self) -> &Path {
        self.sink.path()
    }
}

#[async_trait]
impl Connection for TracedConnection {
    fn backend_name(&self) -> &str {
        self.inner.backend_name()
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64> {
        let start = Instant::now();
        let result = self.inner.execute(sql, params).await;
        match &result {
            Ok(rows) => self.sink.record(&format!(
                "execute  {sql}  params={} rows={rows} elapsed={:?}",
                params.len(),
                start.elapsed()
            )),
            Err(e) => self.sink.record(&format!(
                "execute  {sql}  params={} error={e}",
                params.len()
            )),
        }
        result
    }

    async fn query_text(&self, sql: &str) -> Result<Vec<TextRow>> {
        let start = Instant::now();
        let result = self.inner.query_text(sql).await;
        match &result {
            Ok(rows) => self.sink.record(&format!(
                "query  {sql}  rows={} elapsed={:?}",
                rows.len(),
                start.elapsed()
            )),
            Err(e) => self.sink.record(&format!("query  {sql}  error={e}")),
        }
        result
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    async fn reset(&self) -> Result<()> {
        let result = self.inner.reset().await;
        match &result {
            Ok(()) => self.sink.record(&format!(
                "reset  backend_pid={}",
                self.inner.backend_pid().unwrap_or(0)
            )),
            Err(e) => self.sink.record(&format!("reset  error={e}")),
        }
        result
    }

    async fn close(&self) -> Result<()> {
        self.sink.record("detach");
        self.inner.close().await
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn backend_pid(&self) -> Option<i32> {
        self.inner.backend_pid()
    }
}

//! Connection trait and statement parameter types

use crate::Result;
use async_trait::async_trait;

/// A statement parameter value.
///
/// Deliberately small: pooled connections are handed to request handlers
/// that mostly run parameterized DML and simple lookups. Backends downcast
/// to their concrete connection type for anything richer.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL NULL
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// One result row from a text-mode query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRow {
    /// Column names, in select-list order
    pub columns: Vec<String>,
    /// Column values; `None` is SQL NULL
    pub values: Vec<Option<String>>,
}

/// A pooled database connection.
///
/// A connection is owned either by a pool's idle set or by exactly one
/// caller between acquire and release, never both. Implementations must be
/// safe to share across threads because the pool hands out `Arc`s.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Backend identifier (e.g. "postgresql")
    fn backend_name(&self) -> &str;

    /// Execute a statement that modifies data, returning the affected row count
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> Result<u64>;

    /// Execute a query over the simple (text) protocol and collect its rows
    async fn query_text(&self, sql: &str) -> Result<Vec<TextRow>>;

    /// Cheap local liveness check; must not perform I/O.
    ///
    /// Pools call this on every acquire, so an implementation that needs a
    /// round trip to decide belongs in `reset`, not here.
    fn is_healthy(&self) -> bool;

    /// Re-establish the connection in place, keeping the same handle.
    ///
    /// Called at most once per acquire when `is_healthy` reports false.
    async fn reset(&self) -> Result<()>;

    /// Close the connection. Closing an already-closed connection is a no-op.
    async fn close(&self) -> Result<()>;

    /// Check if the connection has been closed
    fn is_closed(&self) -> bool;

    /// Backend session id, when the backend exposes one
    fn backend_pid(&self) -> Option<i32>;
}

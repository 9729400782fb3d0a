//! Connection factory trait
//!
//! The construct/destroy pair a resource list is parameterized by. The
//! factory owns everything backend-specific about opening a connection
//! (conninfo handling, TLS, trace decoration); the pool only sees opaque
//! `Arc<dyn Connection>` resources.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Connection, Result};

/// Factory for creating and destroying pooled connections
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Open a new connection.
    ///
    /// On failure nothing may be leaked: a half-opened connection must be
    /// closed before the error is returned.
    async fn construct(&self) -> Result<Arc<dyn Connection>>;

    /// Close a connection, detaching any decoration first.
    ///
    /// Infallible from the pool's point of view; close errors are logged
    /// and swallowed here.
    async fn destroy(&self, conn: Arc<dyn Connection>) {
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "error closing pooled connection");
        }
    }
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn construct(&self) -> Result<Arc<dyn Connection>> {
        (**self).construct().await
    }

    async fn destroy(&self, conn: Arc<dyn Connection>) {
        (**self).destroy(conn).await
    }
}

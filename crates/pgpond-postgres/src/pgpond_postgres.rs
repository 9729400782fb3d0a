//! pgpond Postgres - PostgreSQL backend for pgpond pools
//!
//! Provides the tokio-postgres-backed [`Connection`](pgpond_core::Connection)
//! implementation, the pool connection factory, the per-connection protocol
//! trace decorator, and the [`PgFactoryProvider`] that engine initialization
//! uses to wire it all together.

mod connection;
mod factory;
mod params;
mod tls;
mod trace;

#[cfg(test)]
mod tests;

pub use connection::PgConnection;
pub use factory::{PgConnectionFactory, PgFactoryProvider};
pub use trace::{TraceSink, TracedConnection};

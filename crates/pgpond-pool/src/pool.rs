//! Named pools and the caller-facing acquire/release façade
//!
//! A [`PgPool`] binds a name, a conninfo string, and sizing settings to a
//! bounded [`ResourceList`](crate::engine::ResourceList). Request handlers
//! interact with it through a [`ConnectionSlot`]:
//!
//! ```ignore
//! use pgpond_pool::{AcquireOutcome, ConnectionSlot};
//!
//! let mut slot = ConnectionSlot::new();
//! match pool.acquire(&mut slot).await {
//!     AcquireOutcome::Acquired => {
//!         let conn = slot.connection().unwrap();
//!         // Use connection...
//!         pool.release(&mut slot).await;
//!     }
//!     other => tracing::warn!(?other, "no connection"),
//! }
//! ```

mod config;
mod container;

#[cfg(test)]
mod tests;

pub use config::{CatalogCacheMode, PoolSettings};
pub use container::{AcquireOutcome, ConnectionSlot, PgPool, ReleaseOutcome};

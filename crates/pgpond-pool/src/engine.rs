//! The bounded resource list
//!
//! A generic bounded pool of connections, parameterized by a
//! construct/destroy factory and the min / soft-max / hard-max / TTL
//! sizing contract. All concurrency control for a pool lives here.
//!
//! # Example
//!
//! ```ignore
//! use pgpond_pool::engine::ResourceList;
//!
//! let list = ResourceList::new(1, 4, 8, Duration::from_secs(60), factory).await;
//! let conn = list.acquire().await?;
//! // Use connection...
//! list.release(conn).await;
//! ```

mod gauge;
mod reslist;


pub use gauge::PoolGauge;
pub use reslist::ResourceList;

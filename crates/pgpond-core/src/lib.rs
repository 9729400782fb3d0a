//! pgpond Core - foundational traits and types for pgpond
//!
//! This crate provides the abstractions the pooling and backend crates
//! depend on. It defines:
//!
//! - `Connection` - trait for pooled database connections
//! - `ConnectionFactory` - the construct/destroy pair a pool is built over
//! - `PondError` / `Result` - the error taxonomy
//! - `SqlParam` / `TextRow` - minimal statement parameter and row types

mod connection;
mod error;
mod factory;

pub use connection::*;
pub use error::*;
pub use factory::*;

//! Error types for pgpond

use thiserror::Error;

/// Core error type for pgpond operations
#[derive(Error, Debug)]
pub enum PondError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Duplicate connection name: {0}")]
    DuplicateName(String),

    #[error("Pool exhausted: {0}")]
    Exhausted(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pgpond operations
pub type Result<T> = std::result::Result<T, PondError>;

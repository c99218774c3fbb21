//! Error types for the chain pipeline

use thiserror::Error;

/// Result type for chain operations
pub type Result<T> = std::result::Result<T, Error>;

/// Chain errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (zero batch size, zero capacity, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chain integrity violation found during verification
    #[error("Integrity violation at block {index}: {reason}")]
    IntegrityViolation {
        /// Index of the offending block
        index: u64,
        /// What failed
        reason: String,
    },

    /// Concurrency error (batching task panicked, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

//! Common error types for showreel

use thiserror::Error;

/// Common result type for showreel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the showreel crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog document could not be decoded
    #[error("Catalog decode error: {0}")]
    CatalogDecode(#[from] serde_json::Error),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

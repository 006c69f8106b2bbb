//! Error types for showreel-player
//!
//! Only the collaborator-facing edges fail with real errors: catalog fetches
//! and command parsing. The coordinator and loader never return errors.

use thiserror::Error;

/// Main error type for showreel-player
#[derive(Error, Debug)]
pub enum Error {
    /// Errors bubbled up from the common crate (config, catalog decode)
    #[error(transparent)]
    Common(#[from] showreel_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network errors talking to the content store
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Content store answered with a non-success status
    #[error("Catalog request to {url} failed with status {status}")]
    CatalogStatus { url: String, status: u16 },

    /// Neither a catalog path nor a URL was configured
    #[error("No catalog source configured")]
    NoCatalogSource,

    /// Unparseable driver command
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// Convenience Result type using showreel-player Error
pub type Result<T> = std::result::Result<T, Error>;

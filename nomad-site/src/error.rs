//! Error types for nomad-site
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the nomad-site server
#[derive(Error, Debug)]
pub enum SiteError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Content tree or front matter errors
    #[error("Content error: {0}")]
    Content(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the nomad-site error
pub type Result<T> = std::result::Result<T, SiteError>;

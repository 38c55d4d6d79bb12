//! Error types for nomad-ambience
//!
//! Defines crate-specific error types using thiserror for clear error
//! propagation. Playback-path failures (autoplay rejection, load timeouts,
//! start failures) are deliberately NOT represented here: the manager
//! absorbs them into flags and logged diagnostics instead of raising them.

use thiserror::Error;

/// Main error type for nomad-ambience
#[derive(Error, Debug)]
pub enum AmbienceError {
    /// Invalid track registry or route table
    #[error("Registry error: {0}")]
    Registry(String),

    /// Settings store access errors
    #[error("Settings store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Audio graph construction or node connection errors
    #[error("Audio graph error: {0}")]
    Graph(#[from] crate::graph::GraphError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using the nomad-ambience error
pub type Result<T> = std::result::Result<T, AmbienceError>;

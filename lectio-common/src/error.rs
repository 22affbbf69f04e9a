//! Error types shared across Lectio crates
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for lectio-common
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus structure violations (empty chapters, duplicate verse ids)
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// Missing verse or chapter
    #[error("Not found: {0}")]
    NotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using lectio-common Error
pub type Result<T> = std::result::Result<T, Error>;

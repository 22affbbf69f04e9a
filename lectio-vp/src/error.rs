//! Error types for lectio-vp
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Note that clip acquisition failures do NOT travel as errors
//! past the fetch coordinator: they resolve to a "no clip" outcome there,
//! and the scheduler treats that as a recoverable stall.

use thiserror::Error;

/// Main error type for the verse player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus loading or lookup errors
    #[error("Corpus error: {0}")]
    Corpus(#[from] lectio_common::Error),

    /// Speech synthesis service errors
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using lectio-vp Error
pub type Result<T> = std::result::Result<T, Error>;

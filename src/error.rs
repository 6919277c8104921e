//! Error types for tremolo.
//!
//! Most failures in the playback core degrade instead of surfacing (see the
//! graph fallback and the device error events), so this enum is mainly used
//! at construction boundaries: opening the output stream, decoding a source,
//! installing the processing chain and loading configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Source could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Processing graph could not be built or attached
    #[error("Processing graph error: {0}")]
    Graph(String),

    /// Invalid analysis tap configuration
    #[error("Analysis tap error: {0}")]
    Tap(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

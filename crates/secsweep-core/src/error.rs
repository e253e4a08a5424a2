//! Error types for the sweep pipeline.
//!
//! Only [`SweepError`] can abort a run, and only before the first step
//! executes. Everything that goes wrong while a step runs is recorded in its
//! `StepResult`; everything that goes wrong while reading a step's output
//! becomes `Metric::Unavailable`.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup errors.
#[derive(Error, Debug)]
pub enum SweepError {
    /// Output directory could not be created or written to
    #[error("output directory {path} is not writable: {source}")]
    OutputDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step catalog violates one of its structural invariants
    #[error("invalid step catalog: {0}")]
    InvalidCatalog(String),

    /// Settings file could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SweepError {
    fn from(err: serde_json::Error) -> Self {
        SweepError::Serialization(err.to_string())
    }
}

/// Result type alias for fatal pipeline operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Reasons a metric could not be extracted from a step's output.
///
/// Never leaves the collector; each variant is logged and then mapped to
/// `Metric::Unavailable`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("output file {0} does not exist")]
    Missing(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{pointer} in {path} is not an array")]
    PointerNotArray { path: PathBuf, pointer: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },
}

/// Failure to deliver a run's artifacts to the sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("IO error while publishing: {0}")]
    Io(String),

    #[error("artifact destination unavailable: {0}")]
    DestinationUnavailable(String),

    #[error("failed to serialize manifest: {0}")]
    Serialization(String),

    #[error("retention of {0} days is out of range")]
    RetentionOutOfRange(u32),
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        PublishError::Io(err.to_string())
    }
}

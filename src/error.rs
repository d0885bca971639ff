//! Error types for the attention monitor

use thiserror::Error;

/// Errors that can occur at the edges of the pipeline.
///
/// Classification itself never fails: degenerate geometry degrades to zero
/// offsets and a missing face is an ordinary signal state.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse frame record: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing landmark: {0}")]
    MissingLandmark(String),

    #[error("Invalid landmark value: {0}")]
    InvalidLandmark(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported schema version: {0}")]
    UnsupportedSchema(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Frame source error: {0}")]
    SourceError(String),
}

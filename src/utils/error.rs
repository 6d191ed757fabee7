//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while loading or validating a profile document
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid profile format: {0}")]
    InvalidFormat(String),

    #[error("No thread at index {0}")]
    ThreadNotFound(usize),

    #[error("Category list has no default (grey) category")]
    MissingDefaultCategory,
}

/// Errors that can occur while applying a transform
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Marker payload names unknown schema: {0}")]
    MissingMarkerSchema(String),

    #[error("Transform references out-of-range index: {0}")]
    IndexOutOfRange(String),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("No stacks to render")]
    EmptyStacks,

    #[error("Flamegraph rendering failed: {0}")]
    RenderFailed(String),
}

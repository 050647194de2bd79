//! Error types for surfio

use std::io;
use thiserror::Error;

/// Main error type for surfio decoding operations
#[derive(Debug, Error)]
pub enum MeshIoError {
    /// IO error raised while reading an in-memory stream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// No decoder matches, or a recognized sub-codec is not implemented
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Truncated buffer, bad magic, or size fields inconsistent with the data
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Corrupt or truncated gzip/zlib/zip stream
    #[error("Decompression error: {0}")]
    Decompression(String),

    /// Overlay vertex count cannot be matched to the background mesh
    #[error("Vertex count mismatch: overlay has {layer} vertices, mesh has {mesh}")]
    VertexCountMismatch { layer: usize, mesh: usize },

    /// A 64-bit integer does not fit in 32 bits
    #[error("Integer overflow: {0}")]
    IntegerOverflow(String),

    /// Parallel color table arrays disagree
    #[error("Invalid color table: {0}")]
    InvalidColorTable(String),
}

/// Result type alias for surfio operations
pub type Result<T> = std::result::Result<T, MeshIoError>;

impl From<String> for MeshIoError {
    fn from(s: String) -> Self {
        MeshIoError::MalformedInput(s)
    }
}

impl From<&str> for MeshIoError {
    fn from(s: &str) -> Self {
        MeshIoError::MalformedInput(s.to_string())
    }
}

impl MeshIoError {
    /// Shorthand for a `MalformedInput` error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        MeshIoError::MalformedInput(msg.into())
    }

    /// Shorthand for an `UnsupportedFormat` error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        MeshIoError::UnsupportedFormat(msg.into())
    }
}

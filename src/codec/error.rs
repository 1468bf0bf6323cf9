//! Error types for resource encoding and decoding.

use thiserror::Error;

/// Errors from the resource codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Unrecognized resource kind '{kind}'")]
    UnrecognizedKind { kind: String },

    /// An in-memory resource has no registered encoding. Indicates a
    /// programming defect rather than bad input.
    #[error("Internal error: no codec registered for kind '{kind}'")]
    UnregisteredKind { kind: String },

    #[error("Failed to parse resource document: {reason}")]
    Parse { reason: String },

    #[error("Invalid resource document: {reason}")]
    InvalidShape { reason: String },

    #[error("Invalid {kind} resource: {reason}")]
    Field { kind: String, reason: String },

    #[error("Failed to render resource document: {reason}")]
    Render { reason: String },
}

impl CodecError {
    /// Whether this error is a defect in the program rather than in the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnregisteredKind { .. })
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

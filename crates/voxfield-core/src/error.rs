//! Error types for voxfield.

use thiserror::Error;

/// The main error type for density field computations.
///
/// Every variant is fatal for the computation that raised it; nothing is
/// retried and no partial field is ever returned.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Block, resolution or configuration values are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A texture, buffer or pipeline could not be created.
    #[error("resource allocation failed: {0}")]
    ResourceAllocationFailure(String),

    /// The render target for a layer failed completeness validation.
    #[error("render target for layer {layer} is incomplete: {reason}")]
    FramebufferIncomplete { layer: u32, reason: String },

    /// The device to host transfer failed.
    #[error("readback failed: {0}")]
    ReadbackFailure(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FieldError {
    /// Returns `true` for errors raised while the slice loop was running.
    #[must_use]
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Self::FramebufferIncomplete { .. } | Self::ReadbackFailure(_)
        )
    }
}

/// A specialized Result type for voxfield operations.
pub type Result<T> = std::result::Result<T, FieldError>;

//! Rendering error types.

use thiserror::Error;
use voxfield_core::FieldError;

/// Errors that can occur while driving the GPU.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter: {0}")]
    AdapterCreationFailed(String),

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// The adapter does not support the usages a volume needs.
    #[error("{format:?} volumes are not supported by this adapter (missing {missing:?})")]
    UnsupportedFormat {
        format: wgpu::TextureFormat,
        missing: wgpu::TextureUsages,
    },

    /// A requested size is above a device limit.
    #[error("{what} of {requested} exceeds the device limit of {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// A volume layer cannot be used as a color attachment.
    #[error("layer {layer} is not a complete render target: {reason}")]
    AttachmentIncomplete { layer: u32, reason: String },

    /// Mapping a buffer for reading failed.
    #[error("GPU buffer mapping failed: {0}")]
    BufferMapFailed(String),

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for FieldError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::AttachmentIncomplete { layer, reason } => {
                FieldError::FramebufferIncomplete { layer, reason }
            }
            RenderError::BufferMapFailed(reason) => FieldError::ReadbackFailure(reason),
            other => FieldError::ResourceAllocationFailure(other.to_string()),
        }
    }
}

/// Converts a captured wgpu error into the matching [`RenderError`].
pub(crate) fn classify(
    err: &wgpu::Error,
    wrap: impl FnOnce(String) -> RenderError,
) -> RenderError {
    match err {
        wgpu::Error::OutOfMemory { .. } => RenderError::OutOfMemory,
        other => wrap(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_error_maps_to_framebuffer_incomplete() {
        let err: FieldError = RenderError::AttachmentIncomplete {
            layer: 3,
            reason: "not renderable".into(),
        }
        .into();
        assert!(matches!(err, FieldError::FramebufferIncomplete { layer: 3, .. }));
    }

    #[test]
    fn test_limit_maps_to_allocation_failure() {
        let err: FieldError = RenderError::LimitExceeded {
            what: "3D texture dimension",
            requested: 4096,
            limit: 2048,
        }
        .into();
        match err {
            FieldError::ResourceAllocationFailure(msg) => {
                assert_eq!(msg, "3D texture dimension of 4096 exceeds the device limit of 2048");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_format_is_allocation_failure() {
        let err: FieldError = RenderError::UnsupportedFormat {
            format: wgpu::TextureFormat::R32Float,
            missing: wgpu::TextureUsages::RENDER_ATTACHMENT,
        }
        .into();
        assert!(matches!(err, FieldError::ResourceAllocationFailure(_)));
    }

    #[test]
    fn test_map_failure_is_readback_failure() {
        let err: FieldError = RenderError::BufferMapFailed("device lost".into()).into();
        assert!(matches!(err, FieldError::ReadbackFailure(_)));
    }
}

//! wgpu backend for voxfield.
//!
//! This crate renders density fields on the GPU:
//! - Headless device setup and error-scope handling ([`GpuContext`])
//! - 3D volume textures with per-layer render targets and readback
//! - The slice pass shader and pluggable WGSL evaluators
//! - [`GpuBackend`], the [`voxfield_core::VolumeBackend`] implementation

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
// Vertex counts and texel sizes fit comfortably in u32
#![allow(clippy::cast_possible_truncation)]

pub mod backend;
pub mod buffer;
pub mod context;
pub mod error;
pub mod shader;
pub mod slice_renderer;
pub mod volume;

pub use backend::GpuBackend;
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use shader::{ShaderBuilder, ShaderEvaluator, SLICE_PRELUDE};
pub use slice_renderer::{FieldUniforms, QuadGeometry, SliceRenderer};
pub use volume::{SliceTarget, VolumeTexture, VOLUME_FORMAT};

//! voxfield: GPU-sliced density field generation.
//!
//! A density field is a cube of scalar samples (a block) that iso-surface
//! extraction such as marching cubes consumes. voxfield evaluates a density
//! function over a `R³` lattice by rendering one full-screen quad per z-layer
//! into a 3D texture, then reading the whole volume back in one transfer.
//!
//! # Quick Start
//!
//! ```no_run
//! use voxfield::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let block = Block::new(Vec3::new(0.0, 0.0, 0.0), 32.0)?;
//!     let resolution = GridResolution::new(33)?;
//!
//!     let field = compute_density_field_gpu(
//!         &block,
//!         resolution,
//!         &ShaderEvaluator::terrain(),
//!         LatticeMapping::Spanning,
//!     )?;
//!
//!     // x fastest, then y, then z
//!     let value = field.as_slice()[field.index(1, 2, 3)];
//!     println!("density at (1, 2, 3): {value}");
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`GpuBackend`] renders slices with wgpu and WGSL evaluators
//! - [`CpuBackend`] rasterizes the same quad in host memory with any
//!   [`DensityEvaluator`]
//!
//! Both are driven by [`FieldOrchestrator`], which owns the slice order and
//! the single readback.

mod evaluators;
mod headless;

pub use evaluators::BuiltinEvaluator;
pub use headless::{compute_density_field_cpu, compute_density_field_gpu};

// Re-export core types
pub use voxfield_core::{
    compute_density_field, linear_index, Block, ConstantDensity, CpuBackend, DensityEvaluator,
    DensityField, FieldConfig, FieldError, FieldOrchestrator, FieldState, FieldStats,
    GridResolution, IndexEncodingDensity, LatticeMapping, LayerParams, Result, SamplePosition,
    SphereDensity, TerrainDensity, UVec3, Vec3, VolumeBackend,
};

// Re-export render types
pub use voxfield_render::{GpuBackend, GpuContext, RenderError, ShaderEvaluator};

/// Installs `env_logger` as the `log` backend.
///
/// Filtering follows `RUST_LOG`. Calling this more than once is harmless.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

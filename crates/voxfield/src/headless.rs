//! One-call entry points that set up a backend and compute a single block.

use pollster::FutureExt;
use voxfield_core::{
    Block, CpuBackend, DensityEvaluator, DensityField, FieldOrchestrator, GridResolution,
    LatticeMapping, Result,
};
use voxfield_render::{GpuBackend, GpuContext, ShaderEvaluator};

/// Computes a density field on the GPU without a window.
///
/// Creates a headless device, compiles `evaluator` into the slice pass and
/// runs one computation. Failing to find an adapter is reported as a
/// resource allocation failure.
///
/// # Example
/// ```no_run
/// use voxfield::*;
///
/// let block = Block::new(Vec3::ZERO, 32.0).unwrap();
/// let resolution = GridResolution::new(33).unwrap();
/// let field = compute_density_field_gpu(
///     &block,
///     resolution,
///     &ShaderEvaluator::terrain(),
///     LatticeMapping::Spanning,
/// )
/// .unwrap();
/// assert_eq!(field.len(), 33 * 33 * 33);
/// ```
pub fn compute_density_field_gpu(
    block: &Block,
    resolution: GridResolution,
    evaluator: &ShaderEvaluator,
    mapping: LatticeMapping,
) -> Result<DensityField> {
    let context = GpuContext::new_headless().block_on()?;
    let backend = GpuBackend::new(&context, evaluator)?;
    FieldOrchestrator::with_mapping(backend, mapping).compute_density_field(block, resolution)
}

/// Computes a density field in host memory.
///
/// Produces the same layout as [`compute_density_field_gpu`] and works on
/// machines without a GPU.
pub fn compute_density_field_cpu<E: DensityEvaluator>(
    block: &Block,
    resolution: GridResolution,
    evaluator: E,
    mapping: LatticeMapping,
) -> Result<DensityField> {
    FieldOrchestrator::with_mapping(CpuBackend::new(evaluator), mapping)
        .compute_density_field(block, resolution)
}

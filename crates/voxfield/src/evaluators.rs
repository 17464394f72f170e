//! Built-in evaluators available on both backends.

use std::fmt;

use voxfield_core::{
    ConstantDensity, DensityEvaluator, IndexEncodingDensity, LayerParams, SamplePosition,
    SphereDensity, TerrainDensity, Vec3,
};
use voxfield_render::ShaderEvaluator;

/// A density function with matching host and WGSL implementations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BuiltinEvaluator {
    /// Rolling sine terrain over a flat ground level.
    #[default]
    Terrain,
    /// The same value at every sample.
    Constant(f32),
    /// Positive inside a sphere, negative outside.
    Sphere { center: Vec3, radius: f32 },
    /// Writes `x + 100 * y + 10000 * z`.
    IndexEncoding,
}

impl BuiltinEvaluator {
    /// The WGSL counterpart of this evaluator.
    pub fn to_shader(&self) -> ShaderEvaluator {
        match *self {
            Self::Terrain => ShaderEvaluator::terrain(),
            Self::Constant(value) => ShaderEvaluator::constant(value),
            Self::Sphere { center, radius } => ShaderEvaluator::sphere(center, radius),
            Self::IndexEncoding => ShaderEvaluator::index_encoding(),
        }
    }
}

impl DensityEvaluator for BuiltinEvaluator {
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32 {
        match *self {
            Self::Terrain => TerrainDensity::default().sample(position, params),
            Self::Constant(value) => ConstantDensity(value).sample(position, params),
            Self::Sphere { center, radius } => {
                SphereDensity { center, radius }.sample(position, params)
            }
            Self::IndexEncoding => IndexEncodingDensity.sample(position, params),
        }
    }
}

impl fmt::Display for BuiltinEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terrain => write!(f, "terrain"),
            Self::Constant(value) => write!(f, "constant({value})"),
            Self::Sphere { center, radius } => write!(f, "sphere({center}, {radius})"),
            Self::IndexEncoding => write!(f, "index"),
        }
    }
}

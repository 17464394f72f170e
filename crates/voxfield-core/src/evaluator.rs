//! The density evaluator capability and its host-side implementations.

use glam::{UVec3, Vec3};

use crate::block::{Block, GridResolution, LatticeMapping};

/// Rasterized position of one sample within a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplePosition {
    /// Column within the slice (x).
    pub column: u32,
    /// Row within the slice (y).
    pub row: u32,
}

impl SamplePosition {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }
}

/// Parameters bound to the evaluator for the slice being rendered.
///
/// `origin`, `size` and `spacing` are set once per computation; `layer`
/// changes before every slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerParams {
    /// World-space corner of the block.
    pub origin: Vec3,
    /// Edge length of the block.
    pub size: f32,
    /// Distance between neighbouring lattice samples.
    pub spacing: f32,
    /// Current depth layer (z).
    pub layer: u32,
}

impl LayerParams {
    /// Builds the static part of the parameters for `block`; `layer` starts at 0.
    pub fn for_block(block: &Block, resolution: GridResolution, mapping: LatticeMapping) -> Self {
        Self {
            origin: block.origin(),
            size: block.size(),
            spacing: mapping.spacing(block, resolution),
            layer: 0,
        }
    }

    /// Returns a copy bound to `layer`.
    #[must_use]
    pub fn with_layer(self, layer: u32) -> Self {
        Self { layer, ..self }
    }

    /// Lattice index of `position` in the current layer.
    pub fn lattice_index(&self, position: SamplePosition) -> UVec3 {
        UVec3::new(position.column, position.row, self.layer)
    }

    /// World position of `position` in the current layer.
    pub fn world_position(&self, position: SamplePosition) -> Vec3 {
        self.origin + self.lattice_index(position).as_vec3() * self.spacing
    }
}

/// Maps a sample position plus the bound layer parameters to a density value.
///
/// This is the host-side form of the field function. The GPU backend runs the
/// equivalent WGSL code once per rasterized fragment instead.
pub trait DensityEvaluator {
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32;
}

impl<F> DensityEvaluator for F
where
    F: Fn(SamplePosition, &LayerParams) -> f32,
{
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32 {
        self(position, params)
    }
}

/// Returns the same value at every lattice point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantDensity(pub f32);

impl DensityEvaluator for ConstantDensity {
    fn sample(&self, _position: SamplePosition, _params: &LayerParams) -> f32 {
        self.0
    }
}

/// Encodes the lattice index as `x + 100 * y + 10000 * z`.
///
/// Useful to verify the storage layout: every value decodes back to the
/// index it was evaluated at as long as the resolution stays below 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexEncodingDensity;

impl IndexEncodingDensity {
    /// Recovers the lattice index from an encoded value.
    pub fn decode(value: f32) -> UVec3 {
        let encoded = value.round() as u32;
        UVec3::new(encoded % 100, (encoded / 100) % 100, encoded / 10_000)
    }
}

impl DensityEvaluator for IndexEncodingDensity {
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32 {
        let idx = params.lattice_index(position);
        (idx.x + 100 * idx.y + 10_000 * idx.z) as f32
    }
}

/// Signed distance to a sphere, negated so the inside is positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereDensity {
    pub center: Vec3,
    pub radius: f32,
}

impl DensityEvaluator for SphereDensity {
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32 {
        self.radius - params.world_position(position).distance(self.center)
    }
}

/// Rolling terrain: positive below a height surface made of a few octaves of
/// sine hills, negative above it.
///
/// The WGSL built-in `terrain` evaluator computes the same expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainDensity {
    /// Height of the flat ground level in world units.
    pub ground_level: f32,
    /// Amplitude of the first octave.
    pub amplitude: f32,
    /// Horizontal frequency of the first octave.
    pub frequency: f32,
}

impl Default for TerrainDensity {
    fn default() -> Self {
        Self {
            ground_level: 12.0,
            amplitude: 6.0,
            frequency: 0.15,
        }
    }
}

impl TerrainDensity {
    /// Density at a world position.
    pub fn at(&self, world: Vec3) -> f32 {
        let mut height = self.ground_level;
        let mut amplitude = self.amplitude;
        let mut frequency = self.frequency;
        for _ in 0..3 {
            height += amplitude * (world.x * frequency).sin() * (world.z * frequency).cos();
            amplitude *= 0.5;
            frequency *= 2.0;
        }
        height - world.y
    }
}

impl DensityEvaluator for TerrainDensity {
    fn sample(&self, position: SamplePosition, params: &LayerParams) -> f32 {
        self.at(params.world_position(position))
    }
}

//! Host-side density field and its storage-order contract.

use glam::{UVec3, Vec3};

use crate::block::{Block, GridResolution, LatticeMapping};
use crate::error::{FieldError, Result};

/// Flat offset of lattice point `(x, y, z)` in a grid of `resolution` samples per axis.
///
/// X varies fastest, then Y, then Z. Any iso-surface extractor reading the
/// field must use the same layout.
#[inline]
pub fn linear_index(resolution: GridResolution, x: u32, y: u32, z: u32) -> usize {
    let r = resolution.samples() as usize;
    x as usize + y as usize * r + z as usize * r * r
}

/// Summary statistics of a density field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// A density field sampled on a regular lattice over one block.
///
/// Owns its buffer; the buffer is released when the field is dropped or
/// moved out with [`DensityField::into_vec`].
#[derive(Debug, Clone, PartialEq)]
pub struct DensityField {
    block: Block,
    resolution: GridResolution,
    mapping: LatticeMapping,
    values: Vec<f32>,
}

impl DensityField {
    /// Wraps a buffer read back from a volume.
    ///
    /// Fails with [`FieldError::ReadbackFailure`] if the buffer does not hold
    /// exactly `R³` samples.
    pub fn from_raw(
        block: Block,
        resolution: GridResolution,
        mapping: LatticeMapping,
        values: Vec<f32>,
    ) -> Result<Self> {
        let expected = resolution.volume_len();
        if values.len() != expected {
            return Err(FieldError::ReadbackFailure(format!(
                "expected {expected} samples, got {}",
                values.len()
            )));
        }
        Ok(Self {
            block,
            resolution,
            mapping,
            values,
        })
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    pub fn mapping(&self) -> LatticeMapping {
        self.mapping
    }

    /// Number of samples (`R³`).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat offset of `(x, y, z)`.
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        linear_index(self.resolution, x, y, z)
    }

    /// Lattice coordinates of a flat offset.
    pub fn coords(&self, index: usize) -> UVec3 {
        let r = self.resolution.samples() as usize;
        UVec3::new(
            (index % r) as u32,
            ((index / r) % r) as u32,
            (index / (r * r)) as u32,
        )
    }

    /// Sample at `(x, y, z)`, or `None` outside the lattice.
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<f32> {
        let r = self.resolution.samples();
        if x >= r || y >= r || z >= r {
            return None;
        }
        self.values.get(self.index(x, y, z)).copied()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// Hands the raw buffer to the caller.
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// Iterates `(index, value)` pairs in storage order.
    pub fn iter_voxels(&self) -> impl Iterator<Item = (UVec3, f32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.coords(i), v))
    }

    /// World position of lattice point `(x, y, z)`.
    pub fn world_position(&self, x: u32, y: u32, z: u32) -> Vec3 {
        self.mapping
            .world_position(&self.block, self.resolution, UVec3::new(x, y, z))
    }

    /// Trilinear sample at normalized coordinates `uvw` in `[0, 1]³`.
    ///
    /// Matches the volume texture's sampler: coordinates address texel
    /// centers and are clamped to the edge texels.
    pub fn sample_linear(&self, uvw: Vec3) -> f32 {
        let r = self.resolution.samples();
        let max = (r - 1) as f32;
        let p = (uvw * r as f32 - Vec3::splat(0.5)).clamp(Vec3::ZERO, Vec3::splat(max));

        let lo = p.floor().as_uvec3();
        let hi = (lo + UVec3::ONE).min(UVec3::splat(r - 1));
        let t = p - lo.as_vec3();

        let at = |x: u32, y: u32, z: u32| self.values[self.index(x, y, z)];
        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;

        let c00 = lerp(at(lo.x, lo.y, lo.z), at(hi.x, lo.y, lo.z), t.x);
        let c10 = lerp(at(lo.x, hi.y, lo.z), at(hi.x, hi.y, lo.z), t.x);
        let c01 = lerp(at(lo.x, lo.y, hi.z), at(hi.x, lo.y, hi.z), t.x);
        let c11 = lerp(at(lo.x, hi.y, hi.z), at(hi.x, hi.y, hi.z), t.x);

        lerp(lerp(c00, c10, t.y), lerp(c01, c11, t.y), t.z)
    }

    /// Min, max and mean over all samples.
    pub fn stats(&self) -> FieldStats {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        let mut sum = 0.0_f64;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
        }
        FieldStats {
            min,
            max,
            mean: (sum / self.values.len() as f64) as f32,
        }
    }
}

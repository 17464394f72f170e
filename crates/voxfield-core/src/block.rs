//! Block geometry, grid resolution and the index-to-world mapping.

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// The cubic spatial region sampled by one field computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    origin: Vec3,
    size: f32,
}

impl Block {
    /// Creates a block from its world-space corner and edge length.
    ///
    /// The origin must be finite and the size finite and strictly positive.
    pub fn new(origin: Vec3, size: f32) -> Result<Self> {
        if !origin.is_finite() {
            return Err(FieldError::InvalidConfiguration(format!(
                "block origin must be finite, got {origin}"
            )));
        }
        if !size.is_finite() || size <= 0.0 {
            return Err(FieldError::InvalidConfiguration(format!(
                "block size must be finite and positive, got {size}"
            )));
        }
        Ok(Self { origin, size })
    }

    /// World-space corner of the block.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Edge length of the block.
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Opposite corner of the block.
    pub fn max_corner(&self) -> Vec3 {
        self.origin + Vec3::splat(self.size)
    }
}

impl Default for Block {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            size: 32.0,
        }
    }
}

/// Number of lattice samples per axis.
///
/// The same value is the render-target width, its height and the number of
/// layers, so a single scalar describes the whole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct GridResolution(u32);

impl GridResolution {
    /// Creates a resolution of `samples` lattice points per axis.
    pub fn new(samples: u32) -> Result<Self> {
        if samples == 0 {
            return Err(FieldError::InvalidConfiguration(
                "resolution must be at least 1 sample per axis".into(),
            ));
        }
        Ok(Self(samples))
    }

    /// Creates the resolution that covers `cells` cells per axis (`cells + 1` samples).
    pub fn from_cells(cells: u32) -> Result<Self> {
        let samples = cells.checked_add(1).ok_or_else(|| {
            FieldError::InvalidConfiguration(format!("{cells} cells per axis overflows"))
        })?;
        Self::new(samples)
    }

    /// Samples per axis.
    pub fn samples(self) -> u32 {
        self.0
    }

    /// Cells per axis.
    pub fn cells(self) -> u32 {
        self.0 - 1
    }

    /// Samples per layer (`R²`).
    pub fn layer_len(self) -> usize {
        let r = self.0 as usize;
        r * r
    }

    /// Total number of samples in the volume (`R³`).
    pub fn volume_len(self) -> usize {
        self.layer_len() * self.0 as usize
    }

    /// Grid extent as a vector.
    pub fn extent(self) -> UVec3 {
        UVec3::splat(self.0)
    }
}

impl TryFrom<i64> for GridResolution {
    type Error = FieldError;

    fn try_from(value: i64) -> Result<Self> {
        let samples = u32::try_from(value).map_err(|_| {
            FieldError::InvalidConfiguration(format!(
                "resolution must be a positive sample count, got {value}"
            ))
        })?;
        Self::new(samples)
    }
}

impl TryFrom<i32> for GridResolution {
    type Error = FieldError;

    fn try_from(value: i32) -> Result<Self> {
        Self::try_from(i64::from(value))
    }
}

impl From<GridResolution> for u32 {
    fn from(resolution: GridResolution) -> Self {
        resolution.0
    }
}

impl Default for GridResolution {
    fn default() -> Self {
        Self(33)
    }
}

/// How lattice indices map onto world positions inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatticeMapping {
    /// Samples sit on cell corners; the last sample lands on `origin + size`.
    #[default]
    Spanning,
    /// Samples step by `size / R`; the last sample stops one step short of the far face.
    Partitioned,
}

impl LatticeMapping {
    /// Distance between neighbouring samples along one axis.
    pub fn spacing(self, block: &Block, resolution: GridResolution) -> f32 {
        match self {
            Self::Spanning => block.size() / resolution.cells().max(1) as f32,
            Self::Partitioned => block.size() / resolution.samples() as f32,
        }
    }

    /// World position of lattice point `index`.
    pub fn world_position(self, block: &Block, resolution: GridResolution, index: UVec3) -> Vec3 {
        block.origin() + index.as_vec3() * self.spacing(block, resolution)
    }
}

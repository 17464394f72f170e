//! Host-memory volume backend.
//!
//! Rasterizes each slice on the CPU and calls a [`DensityEvaluator`] once per
//! covered sample. Follows the same protocol as the GPU backend so the
//! orchestrator can run (and be tested) without a graphics device.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;

use crate::backend::VolumeBackend;
use crate::block::{Block, GridResolution};
use crate::error::{FieldError, Result};
use crate::evaluator::{DensityEvaluator, LayerParams, SamplePosition};
use crate::field::linear_index;

/// Largest per-axis resolution accepted by default; matches the common
/// `max_texture_dimension_3d` device limit.
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Two triangles covering normalized device coordinates `[-1, 1]²`.
pub const FULL_SCREEN_QUAD: [[f32; 3]; 6] = [
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, 1.0, 0.0],
];

/// A volume stored in host memory.
#[derive(Debug)]
pub struct CpuVolume {
    resolution: GridResolution,
    texels: Rc<RefCell<Vec<f32>>>,
}

impl CpuVolume {
    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }
}

/// One layer of a [`CpuVolume`] bound for writing.
#[derive(Debug)]
pub struct CpuSlice {
    resolution: GridResolution,
    layer: u32,
    texels: Rc<RefCell<Vec<f32>>>,
}

impl CpuSlice {
    pub fn layer(&self) -> u32 {
        self.layer
    }
}

/// Quad geometry in normalized device coordinates.
#[derive(Debug, Clone)]
pub struct CpuQuad {
    vertices: Vec<[f32; 3]>,
}

impl CpuQuad {
    pub fn full_screen() -> Self {
        Self {
            vertices: FULL_SCREEN_QUAD.to_vec(),
        }
    }

    /// Whether the point `p` (in NDC) lies inside any of the quad's triangles.
    ///
    /// Points on an edge count as covered, so a sample on the shared diagonal
    /// of the two halves is still evaluated exactly once.
    fn covers(&self, p: Vec2) -> bool {
        self.vertices.chunks_exact(3).any(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|v| Vec2::new(v[0], v[1]));
            let area = edge(a, b, c);
            if area == 0.0 {
                return false;
            }
            let weights = [edge(a, b, p), edge(b, c, p), edge(c, a, p)];
            if area > 0.0 {
                weights.iter().all(|&w| w >= 0.0)
            } else {
                weights.iter().all(|&w| w <= 0.0)
            }
        })
    }
}

/// Twice the signed area of the triangle `(a, b, p)`.
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}

/// Runs a host-side evaluator over a volume kept in memory.
pub struct CpuBackend<E: DensityEvaluator> {
    evaluator: E,
    params: Option<LayerParams>,
    max_dimension: u32,
}

impl<E: DensityEvaluator> CpuBackend<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            params: None,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Overrides the largest accepted per-axis resolution.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn into_evaluator(self) -> E {
        self.evaluator
    }
}

impl<E: DensityEvaluator> VolumeBackend for CpuBackend<E> {
    type Volume = CpuVolume;
    type Target = CpuSlice;
    type Quad = CpuQuad;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn create_volume(&mut self, resolution: GridResolution) -> Result<CpuVolume> {
        if resolution.samples() > self.max_dimension {
            return Err(FieldError::ResourceAllocationFailure(format!(
                "resolution {} exceeds the maximum volume dimension {}",
                resolution.samples(),
                self.max_dimension
            )));
        }

        let len = resolution.volume_len();
        let mut texels = Vec::new();
        texels.try_reserve_exact(len).map_err(|e| {
            FieldError::ResourceAllocationFailure(format!("cannot allocate {len} texels: {e}"))
        })?;
        texels.resize(len, 0.0);

        Ok(CpuVolume {
            resolution,
            texels: Rc::new(RefCell::new(texels)),
        })
    }

    fn create_quad(&mut self) -> Result<CpuQuad> {
        Ok(CpuQuad::full_screen())
    }

    fn bind_block(&mut self, _block: &Block, params: &LayerParams) -> Result<()> {
        self.params = Some(*params);
        Ok(())
    }

    fn attach_slice(&mut self, volume: &CpuVolume, layer: u32) -> Result<CpuSlice> {
        if layer >= volume.resolution.samples() {
            return Err(FieldError::FramebufferIncomplete {
                layer,
                reason: format!(
                    "volume has only {} layers",
                    volume.resolution.samples()
                ),
            });
        }
        Ok(CpuSlice {
            resolution: volume.resolution,
            layer,
            texels: Rc::clone(&volume.texels),
        })
    }

    fn bind_layer(&mut self, params: &LayerParams) -> Result<()> {
        let Some(bound) = self.params.as_mut() else {
            return Err(FieldError::InvalidConfiguration(
                "block parameters must be bound before the layer".into(),
            ));
        };
        bound.layer = params.layer;
        Ok(())
    }

    fn render_slice(&mut self, target: &CpuSlice, quad: &CpuQuad) {
        let Some(params) = self.params else {
            log::error!("render_slice called without bound evaluator parameters");
            return;
        };

        let r = target.resolution.samples();
        let mut texels = target.texels.borrow_mut();

        for row in 0..r {
            // Row 0 is the top of the target, where NDC y is +1.
            let ndc_y = 1.0 - (row as f32 + 0.5) / r as f32 * 2.0;
            for column in 0..r {
                let ndc_x = (column as f32 + 0.5) / r as f32 * 2.0 - 1.0;
                if !quad.covers(Vec2::new(ndc_x, ndc_y)) {
                    continue;
                }
                let value = self
                    .evaluator
                    .sample(SamplePosition::new(column, row), &params);
                texels[linear_index(target.resolution, column, row, target.layer)] = value;
            }
        }
    }

    fn read_back(&mut self, volume: &CpuVolume) -> Result<Vec<f32>> {
        let texels = volume.texels.borrow();
        Ok(texels.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::evaluator::ConstantDensity;

    fn bound_backend() -> CpuBackend<ConstantDensity> {
        let mut backend = CpuBackend::new(ConstantDensity(2.5));
        let block = Block::default();
        let res = GridResolution::new(4).unwrap();
        let params = LayerParams::for_block(&block, res, crate::LatticeMapping::Spanning);
        backend.bind_block(&block, &params).unwrap();
        backend
    }

    #[test]
    fn test_full_screen_quad_covers_every_sample_center() {
        let quad = CpuQuad::full_screen();
        assert!(quad.covers(Vec2::new(0.75, 0.75)));
        assert!(quad.covers(Vec2::new(-0.75, 0.75)));
        assert!(quad.covers(Vec2::ZERO));
        assert!(!quad.covers(Vec2::new(1.25, 0.0)));
    }

    #[test]
    fn test_render_slice_writes_only_its_layer() {
        let mut backend = bound_backend();
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        let quad = backend.create_quad().unwrap();

        let target = backend.attach_slice(&volume, 2).unwrap();
        backend.render_slice(&target, &quad);

        let data = backend.read_back(&volume).unwrap();
        for (i, v) in data.iter().enumerate() {
            let expected = if i / 16 == 2 { 2.5 } else { 0.0 };
            assert_eq!(*v, expected, "texel {i}");
        }
    }

    #[test]
    fn test_attach_out_of_range_layer_is_incomplete() {
        let mut backend = bound_backend();
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        let err = backend.attach_slice(&volume, 4).err().unwrap();
        assert!(matches!(err, FieldError::FramebufferIncomplete { layer: 4, .. }));
    }

    #[test]
    fn test_volume_over_limit_fails_allocation() {
        let mut backend = CpuBackend::new(ConstantDensity(0.0)).with_max_dimension(8);
        let err = backend
            .create_volume(GridResolution::new(9).unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, FieldError::ResourceAllocationFailure(_)));
    }

    #[test]
    fn test_partial_quad_leaves_uncovered_samples() {
        let mut backend = bound_backend();
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        // Left half of the target, narrowing towards the top.
        let quad = CpuQuad {
            vertices: vec![[-1.0, -1.0, 0.0], [0.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
        };
        let target = backend.attach_slice(&volume, 0).unwrap();
        backend.render_slice(&target, &quad);

        let data = backend.read_back(&volume).unwrap();
        // Top row (NDC y = 0.75): the triangle spans x in [-0.125, 0].
        assert_eq!(&data[0..4], &[0.0, 0.0, 0.0, 0.0]);
        // Bottom row (NDC y = -0.75): x in [-0.875, 0].
        assert_eq!(&data[12..16], &[2.5, 2.5, 0.0, 0.0]);
    }

    #[test]
    fn test_triangle_coverage_uses_edges_not_bounds() {
        let mut backend = bound_backend();
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        // Lower-left half of NDC; its bounding box is the whole target.
        let quad = CpuQuad {
            vertices: vec![[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]],
        };
        let target = backend.attach_slice(&volume, 0).unwrap();
        backend.render_slice(&target, &quad);

        let data = backend.read_back(&volume).unwrap();
        // Top row: only the sample on the hypotenuse is covered.
        assert_eq!(&data[0..4], &[2.5, 0.0, 0.0, 0.0]);
        // Bottom row is fully inside.
        assert_eq!(&data[12..16], &[2.5, 2.5, 2.5, 2.5]);
    }

    #[test]
    fn test_full_screen_quad_evaluates_each_sample_once() {
        let calls = Cell::new(0_u32);
        let counting = |_: SamplePosition, _: &LayerParams| -> f32 {
            calls.set(calls.get() + 1);
            1.0
        };
        let mut backend = CpuBackend::new(counting);
        let res = GridResolution::new(7).unwrap();
        let block = Block::default();
        let params = LayerParams::for_block(&block, res, crate::LatticeMapping::Spanning);
        backend.bind_block(&block, &params).unwrap();
        let volume = backend.create_volume(res).unwrap();
        let quad = backend.create_quad().unwrap();
        let target = backend.attach_slice(&volume, 3).unwrap();
        backend.render_slice(&target, &quad);

        assert_eq!(calls.get(), 49);
    }
}

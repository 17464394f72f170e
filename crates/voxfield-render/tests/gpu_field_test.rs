//! GPU density field integration tests.
//!
//! These tests need a GPU adapter (real or software fallback). When none is
//! available each test prints a note and returns early.

use pollster::FutureExt;
use voxfield_core::{
    Block, CpuBackend, FieldError, FieldOrchestrator, FieldState, GridResolution,
    IndexEncodingDensity, LatticeMapping, LayerParams, TerrainDensity, Vec3, VolumeBackend,
};
use voxfield_render::{GpuBackend, GpuContext, ShaderEvaluator};

fn gpu() -> Option<GpuContext> {
    match GpuContext::new_headless().block_on() {
        Ok(context) => Some(context),
        Err(e) => {
            eprintln!("Skipping GPU test: no adapter available ({e})");
            None
        }
    }
}

/// Drives a [`GpuBackend`] but refuses to attach one layer.
struct AbortAt {
    inner: GpuBackend,
    layer: u32,
    rendered: Vec<u32>,
    reads: u32,
}

impl VolumeBackend for AbortAt {
    type Volume = <GpuBackend as VolumeBackend>::Volume;
    type Target = <GpuBackend as VolumeBackend>::Target;
    type Quad = <GpuBackend as VolumeBackend>::Quad;

    fn name(&self) -> &'static str {
        "gpu-abort"
    }

    fn create_volume(&mut self, resolution: GridResolution) -> voxfield_core::Result<Self::Volume> {
        self.inner.create_volume(resolution)
    }

    fn create_quad(&mut self) -> voxfield_core::Result<Self::Quad> {
        self.inner.create_quad()
    }

    fn bind_block(&mut self, block: &Block, params: &LayerParams) -> voxfield_core::Result<()> {
        self.inner.bind_block(block, params)
    }

    fn attach_slice(
        &mut self,
        volume: &Self::Volume,
        layer: u32,
    ) -> voxfield_core::Result<Self::Target> {
        if layer == self.layer {
            return Err(FieldError::FramebufferIncomplete {
                layer,
                reason: "attachment refused".into(),
            });
        }
        self.inner.attach_slice(volume, layer)
    }

    fn bind_layer(&mut self, params: &LayerParams) -> voxfield_core::Result<()> {
        self.inner.bind_layer(params)
    }

    fn render_slice(&mut self, target: &Self::Target, quad: &Self::Quad) {
        self.rendered.push(target.layer());
        self.inner.render_slice(target, quad);
    }

    fn read_back(&mut self, volume: &Self::Volume) -> voxfield_core::Result<Vec<f32>> {
        self.reads += 1;
        self.inner.read_back(volume)
    }
}

fn resolution(samples: u32) -> GridResolution {
    GridResolution::new(samples).unwrap()
}

#[test]
fn headless_constant_field() {
    let Some(context) = gpu() else { return };
    let backend = GpuBackend::new(&context, &ShaderEvaluator::constant(1.0)).unwrap();
    let mut orchestrator = FieldOrchestrator::new(backend);

    let block = Block::new(Vec3::ZERO, 32.0).unwrap();
    let field = orchestrator
        .compute_density_field(&block, resolution(33))
        .unwrap();

    assert_eq!(orchestrator.state(), FieldState::Complete);
    assert_eq!(field.len(), 35_937);
    assert!(field.as_slice().iter().all(|&v| v == 1.0));
}

#[test]
fn headless_index_encoding_layout() {
    let Some(context) = gpu() else { return };
    let backend = GpuBackend::new(&context, &ShaderEvaluator::index_encoding()).unwrap();
    let mut orchestrator = FieldOrchestrator::new(backend);

    let block = Block::new(Vec3::new(-3.0, 4.0, 0.5), 6.0).unwrap();
    let field = orchestrator
        .compute_density_field(&block, resolution(7))
        .unwrap();

    for (index, &value) in field.as_slice().iter().enumerate() {
        let coords = field.coords(index);
        assert_eq!(
            IndexEncodingDensity::decode(value),
            coords,
            "sample {index} landed at the wrong position"
        );
    }
}

#[test]
fn headless_terrain_matches_cpu() {
    let Some(context) = gpu() else { return };
    let block = Block::new(Vec3::new(16.0, 0.0, -8.0), 32.0).unwrap();
    let res = resolution(17);

    for mapping in [LatticeMapping::Spanning, LatticeMapping::Partitioned] {
        let gpu_backend = GpuBackend::new(&context, &ShaderEvaluator::terrain()).unwrap();
        let gpu_field = FieldOrchestrator::with_mapping(gpu_backend, mapping)
            .compute_density_field(&block, res)
            .unwrap();

        let cpu_field = FieldOrchestrator::with_mapping(
            CpuBackend::new(TerrainDensity::default()),
            mapping,
        )
        .compute_density_field(&block, res)
        .unwrap();

        for (i, (g, c)) in gpu_field
            .as_slice()
            .iter()
            .zip(cpu_field.as_slice())
            .enumerate()
        {
            assert!(
                (g - c).abs() < 1e-2,
                "{mapping:?} sample {i}: gpu {g} vs cpu {c}"
            );
        }
    }
}

#[test]
fn headless_backend_is_reusable() {
    let Some(context) = gpu() else { return };
    let backend = GpuBackend::new(&context, &ShaderEvaluator::sphere(Vec3::splat(4.0), 3.0)).unwrap();
    let mut orchestrator = FieldOrchestrator::new(backend);

    let block = Block::new(Vec3::ZERO, 8.0).unwrap();
    let first = orchestrator
        .compute_density_field(&block, resolution(9))
        .unwrap();
    let second = orchestrator
        .compute_density_field(&block, resolution(9))
        .unwrap();

    assert_eq!(first.as_slice(), second.as_slice());
    // Center sample sits exactly on the sphere center.
    assert!((first.get(4, 4, 4).unwrap() - 3.0).abs() < 1e-5);
}

#[test]
fn headless_oversized_volume_aborts() {
    let Some(context) = gpu() else { return };
    let too_large = context.limits().max_texture_dimension_3d + 1;
    let backend = GpuBackend::new(&context, &ShaderEvaluator::constant(0.0)).unwrap();
    let mut orchestrator = FieldOrchestrator::new(backend);

    let block = Block::new(Vec3::ZERO, 1.0).unwrap();
    let err = orchestrator
        .compute_density_field(&block, resolution(too_large))
        .unwrap_err();

    assert!(matches!(err, FieldError::ResourceAllocationFailure(_)));
    assert_eq!(orchestrator.state(), FieldState::Aborted);
}

#[test]
fn headless_invalid_wgsl_is_reported() {
    let Some(context) = gpu() else { return };
    let broken = ShaderEvaluator::from_wgsl(
        "broken",
        "fn density(sample: vec2<u32>, layer: u32, world: vec3<f32>) -> f32 { return nope; }",
    );
    assert!(GpuBackend::new(&context, &broken).is_err());
}

#[test]
fn headless_failed_layer_aborts_without_readback() {
    let Some(context) = gpu() else { return };
    let inner = GpuBackend::new(&context, &ShaderEvaluator::constant(1.0)).unwrap();
    let mut orchestrator = FieldOrchestrator::new(AbortAt {
        inner,
        layer: 3,
        rendered: Vec::new(),
        reads: 0,
    });

    let block = Block::new(Vec3::ZERO, 4.0).unwrap();
    let err = orchestrator
        .compute_density_field(&block, resolution(5))
        .unwrap_err();

    assert!(matches!(err, FieldError::FramebufferIncomplete { layer: 3, .. }));
    assert_eq!(orchestrator.state(), FieldState::Aborted);
    let backend = orchestrator.backend();
    assert_eq!(backend.rendered, vec![0, 1, 2]);
    assert_eq!(backend.reads, 0);

    // The wrapped backend still produces a full field afterwards.
    let mut recovered = FieldOrchestrator::new(orchestrator.into_backend().inner);
    let field = recovered
        .compute_density_field(&block, resolution(5))
        .unwrap();
    assert!(field.as_slice().iter().all(|&v| v == 1.0));
}

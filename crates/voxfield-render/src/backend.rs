//! wgpu implementation of the volume backend protocol.

use voxfield_core::{Block, FieldError, GridResolution, LayerParams, VolumeBackend};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::shader::ShaderEvaluator;
use crate::slice_renderer::{FieldUniforms, QuadGeometry, SliceRenderer};
use crate::volume::{SliceTarget, VolumeTexture};

/// Renders density slices on a wgpu device.
///
/// The pipeline is compiled once in [`GpuBackend::new`] and reused for every
/// block. Validation errors raised while a slice renders are held back and
/// reported by the next `attach_slice` or `read_back`, since rendering a
/// slice has no way to fail on its own.
pub struct GpuBackend {
    context: GpuContext,
    renderer: SliceRenderer,
    evaluator_label: String,
    resolution: Option<GridResolution>,
    uniforms: Option<FieldUniforms>,
    deferred_error: Option<FieldError>,
}

impl GpuBackend {
    /// Compiles `evaluator` into a slice pipeline on `context`.
    pub fn new(context: &GpuContext, evaluator: &ShaderEvaluator) -> RenderResult<Self> {
        let renderer = SliceRenderer::new(context, evaluator)?;
        Ok(Self {
            context: context.clone(),
            renderer,
            evaluator_label: evaluator.label().to_string(),
            resolution: None,
            uniforms: None,
            deferred_error: None,
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Label of the compiled evaluator.
    pub fn evaluator_label(&self) -> &str {
        &self.evaluator_label
    }

    fn take_deferred(&mut self) -> voxfield_core::Result<()> {
        match self.deferred_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl VolumeBackend for GpuBackend {
    type Volume = VolumeTexture;
    type Target = SliceTarget;
    type Quad = QuadGeometry;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn create_volume(&mut self, resolution: GridResolution) -> voxfield_core::Result<VolumeTexture> {
        self.deferred_error = None;
        self.uniforms = None;
        let volume = VolumeTexture::create(&self.context, resolution)?;
        self.resolution = Some(resolution);
        Ok(volume)
    }

    fn create_quad(&mut self) -> voxfield_core::Result<QuadGeometry> {
        let quad = self
            .context
            .scoped_allocation(RenderError::BufferCreationFailed, QuadGeometry::full_screen)?;
        Ok(quad)
    }

    fn bind_block(&mut self, block: &Block, params: &LayerParams) -> voxfield_core::Result<()> {
        let Some(resolution) = self.resolution else {
            return Err(FieldError::InvalidConfiguration(
                "a volume must be created before binding a block".into(),
            ));
        };
        log::trace!(
            "binding block at {} (size {}) to '{}'",
            block.origin(),
            block.size(),
            self.evaluator_label
        );
        self.uniforms = Some(FieldUniforms::new(params, resolution.samples()));
        Ok(())
    }

    fn attach_slice(
        &mut self,
        volume: &VolumeTexture,
        layer: u32,
    ) -> voxfield_core::Result<SliceTarget> {
        // A failed render is reported against the layer it drew.
        self.take_deferred()?;
        Ok(volume.attach_slice(&self.context, layer)?)
    }

    fn bind_layer(&mut self, params: &LayerParams) -> voxfield_core::Result<()> {
        let Some(uniforms) = self.uniforms.as_mut() else {
            return Err(FieldError::InvalidConfiguration(
                "block parameters must be bound before the layer".into(),
            ));
        };
        uniforms.layer = params.layer;
        self.renderer.update_uniforms(&self.context.queue, uniforms);
        Ok(())
    }

    fn render_slice(&mut self, target: &SliceTarget, quad: &QuadGeometry) {
        let layer = target.layer();
        let result = self.context.scoped(
            wgpu::ErrorFilter::Validation,
            |reason| RenderError::AttachmentIncomplete { layer, reason },
            |_| self.renderer.render_slice(&self.context, target, quad),
        );
        if let Err(err) = result {
            log::error!("rendering layer {layer} failed: {err}");
            self.deferred_error.get_or_insert(err.into());
        }
    }

    fn read_back(&mut self, volume: &VolumeTexture) -> voxfield_core::Result<Vec<f32>> {
        self.take_deferred()?;
        Ok(volume.read_back(&self.context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::FutureExt;
    use voxfield_core::{LatticeMapping, Vec3};

    fn backend() -> Option<GpuBackend> {
        let context = match GpuContext::new_headless().block_on() {
            Ok(context) => context,
            Err(e) => {
                eprintln!("Skipping GPU test: no adapter available ({e})");
                return None;
            }
        };
        Some(GpuBackend::new(&context, &ShaderEvaluator::constant(1.0)).unwrap())
    }

    fn failed_render(layer: u32) -> FieldError {
        RenderError::AttachmentIncomplete {
            layer,
            reason: "lost attachment".into(),
        }
        .into()
    }

    #[test]
    fn test_deferred_render_error_surfaces_at_next_attach() {
        let Some(mut backend) = backend() else { return };
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        backend.deferred_error = Some(failed_render(1));

        match backend.attach_slice(&volume, 2) {
            Err(FieldError::FramebufferIncomplete { layer, .. }) => assert_eq!(layer, 1),
            other => panic!("expected the layer 1 failure, got {other:?}"),
        }
        // Reported once.
        assert!(backend.attach_slice(&volume, 2).is_ok());
    }

    #[test]
    fn test_deferred_render_error_fails_read_back() {
        let Some(mut backend) = backend() else { return };
        let volume = backend.create_volume(GridResolution::new(4).unwrap()).unwrap();
        backend.deferred_error = Some(failed_render(3));

        assert!(matches!(
            backend.read_back(&volume),
            Err(FieldError::FramebufferIncomplete { layer: 3, .. })
        ));
    }

    #[test]
    fn test_new_volume_clears_deferred_error() {
        let Some(mut backend) = backend() else { return };
        backend.deferred_error = Some(failed_render(0));

        let resolution = GridResolution::new(2).unwrap();
        let volume = backend.create_volume(resolution).unwrap();
        let block = Block::new(Vec3::ZERO, 1.0).unwrap();
        let params = LayerParams::for_block(&block, resolution, LatticeMapping::Spanning);
        backend.bind_block(&block, &params).unwrap();
        assert!(backend.attach_slice(&volume, 0).is_ok());
    }
}

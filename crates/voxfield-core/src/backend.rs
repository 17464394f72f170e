//! The volume backend protocol driven by the orchestrator.
//!
//! A field computation is a scatter/gather over one volume resource: an
//! ordered write phase (one render per layer) followed by a single
//! synchronized read phase. Backends expose the individual steps; the
//! [`FieldOrchestrator`](crate::FieldOrchestrator) owns their order.

use crate::block::{Block, GridResolution};
use crate::error::Result;
use crate::evaluator::LayerParams;

/// A device able to hold a volume, render slices into it and read it back.
pub trait VolumeBackend {
    /// Handle to an allocated `R³` single-channel float volume.
    type Volume;
    /// One layer of a volume bound as the sole render target.
    type Target;
    /// Static full-extent quad geometry shared by every slice.
    type Quad;

    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Allocates an uninitialized volume of `resolution³` samples.
    ///
    /// Fails with `ResourceAllocationFailure` when the size exceeds what the
    /// device supports.
    fn create_volume(&mut self, resolution: GridResolution) -> Result<Self::Volume>;

    /// Sets up the quad geometry once per computation.
    fn create_quad(&mut self) -> Result<Self::Quad>;

    /// Binds the evaluator parameters that stay fixed for the whole block.
    fn bind_block(&mut self, block: &Block, params: &LayerParams) -> Result<()>;

    /// Binds layer `layer` of `volume` as the render target.
    ///
    /// Fails with `FramebufferIncomplete` when the attachment is not
    /// render-complete.
    fn attach_slice(&mut self, volume: &Self::Volume, layer: u32) -> Result<Self::Target>;

    /// Updates the per-layer evaluator parameter.
    fn bind_layer(&mut self, params: &LayerParams) -> Result<()>;

    /// Runs the evaluator over every sample of `target`.
    fn render_slice(&mut self, target: &Self::Target, quad: &Self::Quad);

    /// Copies the whole volume to host memory in x-fastest, then y, then z order.
    ///
    /// Blocks until every queued slice render has finished.
    fn read_back(&mut self, volume: &Self::Volume) -> Result<Vec<f32>>;
}

impl<B: VolumeBackend + ?Sized> VolumeBackend for &mut B {
    type Volume = B::Volume;
    type Target = B::Target;
    type Quad = B::Quad;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn create_volume(&mut self, resolution: GridResolution) -> Result<Self::Volume> {
        (**self).create_volume(resolution)
    }

    fn create_quad(&mut self) -> Result<Self::Quad> {
        (**self).create_quad()
    }

    fn bind_block(&mut self, block: &Block, params: &LayerParams) -> Result<()> {
        (**self).bind_block(block, params)
    }

    fn attach_slice(&mut self, volume: &Self::Volume, layer: u32) -> Result<Self::Target> {
        (**self).attach_slice(volume, layer)
    }

    fn bind_layer(&mut self, params: &LayerParams) -> Result<()> {
        (**self).bind_layer(params)
    }

    fn render_slice(&mut self, target: &Self::Target, quad: &Self::Quad) {
        (**self).render_slice(target, quad);
    }

    fn read_back(&mut self, volume: &Self::Volume) -> Result<Vec<f32>> {
        (**self).read_back(volume)
    }
}

//! Drives one density field computation over a [`VolumeBackend`].

use std::fmt;

use crate::backend::VolumeBackend;
use crate::block::{Block, GridResolution, LatticeMapping};
use crate::error::Result;
use crate::evaluator::LayerParams;
use crate::field::DensityField;

/// Progress of the current (or last) field computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    #[default]
    Uninitialized,
    TextureCreated,
    /// Layer currently being rendered.
    Rendering(u32),
    ReadBack,
    Complete,
    Aborted,
}

impl FieldState {
    /// Returns `true` for `Complete` and `Aborted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::TextureCreated => write!(f, "texture created"),
            Self::Rendering(layer) => write!(f, "rendering layer {layer}"),
            Self::ReadBack => write!(f, "read back"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Runs the slice loop and the final readback for one block at a time.
///
/// The orchestrator owns its backend exclusively; the volume and every
/// per-slice render target live only for the duration of one
/// [`compute_density_field`](Self::compute_density_field) call.
pub struct FieldOrchestrator<B: VolumeBackend> {
    backend: B,
    mapping: LatticeMapping,
    state: FieldState,
}

impl<B: VolumeBackend> FieldOrchestrator<B> {
    /// Creates an orchestrator using the default [`LatticeMapping`].
    pub fn new(backend: B) -> Self {
        Self::with_mapping(backend, LatticeMapping::default())
    }

    pub fn with_mapping(backend: B, mapping: LatticeMapping) -> Self {
        Self {
            backend,
            mapping,
            state: FieldState::Uninitialized,
        }
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    pub fn mapping(&self) -> LatticeMapping {
        self.mapping
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Evaluates the density field of `block` on a `resolution³` lattice.
    ///
    /// Layers are rendered strictly in increasing order and read back once.
    /// Any failure aborts the whole computation and no field is returned.
    pub fn compute_density_field(
        &mut self,
        block: &Block,
        resolution: GridResolution,
    ) -> Result<DensityField> {
        self.state = FieldState::Uninitialized;
        match self.run(block, resolution) {
            Ok(field) => {
                self.transition(FieldState::Complete);
                Ok(field)
            }
            Err(err) => {
                log::error!(
                    "[{}] density field aborted while {}: {err}",
                    self.backend.name(),
                    self.state
                );
                self.state = FieldState::Aborted;
                Err(err)
            }
        }
    }

    fn run(&mut self, block: &Block, resolution: GridResolution) -> Result<DensityField> {
        let samples = resolution.samples();
        log::info!(
            "[{}] computing {samples}^3 density field, origin {}, size {}",
            self.backend.name(),
            block.origin(),
            block.size()
        );

        let volume = self.backend.create_volume(resolution)?;
        self.transition(FieldState::TextureCreated);

        let quad = self.backend.create_quad()?;

        let params = LayerParams::for_block(block, resolution, self.mapping);
        self.backend.bind_block(block, &params)?;

        // Write phase: one render per layer, strictly ordered.
        for layer in 0..samples {
            self.transition(FieldState::Rendering(layer));
            let target = self.backend.attach_slice(&volume, layer)?;
            self.backend.bind_layer(&params.with_layer(layer))?;
            self.backend.render_slice(&target, &quad);
        }

        // Read phase: a single synchronized transfer.
        self.transition(FieldState::ReadBack);
        let values = self.backend.read_back(&volume)?;
        DensityField::from_raw(*block, resolution, self.mapping, values)
    }

    fn transition(&mut self, next: FieldState) {
        log::debug!("[{}] {} -> {}", self.backend.name(), self.state, next);
        self.state = next;
    }
}

/// Validates `resolution` and computes the field of `block` with `backend`.
///
/// A zero or negative resolution is rejected before the backend is touched.
pub fn compute_density_field<B: VolumeBackend>(
    backend: B,
    block: &Block,
    resolution: i64,
) -> Result<DensityField> {
    let resolution = GridResolution::try_from(resolution)?;
    FieldOrchestrator::new(backend).compute_density_field(block, resolution)
}

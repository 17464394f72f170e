//! Core abstractions for voxfield.
//!
//! This crate provides the backend-independent part of density field generation:
//! - [`Block`], [`GridResolution`] and [`LatticeMapping`] describing what is sampled
//! - [`DensityEvaluator`] for host-side field functions
//! - [`VolumeBackend`], the slice-render / readback protocol a device implements
//! - [`FieldOrchestrator`], which drives that protocol for one block
//! - [`DensityField`], the flat x-fastest result buffer
//! - [`CpuBackend`], a host-memory backend usable without a GPU

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Lattice indices are u32 and routinely widened to usize / f32
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod backend;
pub mod block;
pub mod config;
pub mod cpu;
pub mod error;
pub mod evaluator;
pub mod field;
pub mod orchestrator;

pub use backend::VolumeBackend;
pub use block::{Block, GridResolution, LatticeMapping};
pub use config::FieldConfig;
pub use cpu::{CpuBackend, CpuQuad, CpuSlice, CpuVolume, FULL_SCREEN_QUAD};
pub use error::{FieldError, Result};
pub use evaluator::{
    ConstantDensity, DensityEvaluator, IndexEncodingDensity, LayerParams, SamplePosition,
    SphereDensity, TerrainDensity,
};
pub use field::{linear_index, DensityField, FieldStats};
pub use orchestrator::{compute_density_field, FieldOrchestrator, FieldState};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3};

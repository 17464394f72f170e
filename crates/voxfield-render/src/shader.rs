//! Shader management: the slice pass prelude and pluggable WGSL evaluators.

use glam::Vec3;

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Vertex stage, uniform block and fragment entry point of the slice pass.
pub const SLICE_PRELUDE: &str = include_str!("shaders/density_slice.wgsl");

/// GPU-side density function.
///
/// The source must define
/// `fn density(sample: vec2<u32>, layer: u32, world: vec3<f32>) -> f32`.
/// It is compiled together with [`SLICE_PRELUDE`] and may also read the
/// `field` uniform (`origin`, `size`, `spacing`, `layer`, `resolution`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderEvaluator {
    label: String,
    source: String,
}

impl ShaderEvaluator {
    /// Wraps user-provided WGSL.
    pub fn from_wgsl(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Same value everywhere.
    pub fn constant(value: f32) -> Self {
        Self::from_wgsl(
            "constant",
            format!(
                "fn density(sample: vec2<u32>, layer: u32, world: vec3<f32>) -> f32 {{\n    \
                 return {};\n}}\n",
                f32_literal(value)
            ),
        )
    }

    /// Sphere of `radius` around `center`, positive inside.
    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::from_wgsl(
            "sphere",
            format!(
                "fn density(sample: vec2<u32>, layer: u32, world: vec3<f32>) -> f32 {{\n    \
                 let center = vec3<f32>({}, {}, {});\n    \
                 return {} - distance(world, center);\n}}\n",
                f32_literal(center.x),
                f32_literal(center.y),
                f32_literal(center.z),
                f32_literal(radius)
            ),
        )
    }

    /// Built-in rolling terrain, matching `voxfield_core::TerrainDensity::default()`.
    pub fn terrain() -> Self {
        Self::from_wgsl("terrain", include_str!("shaders/evaluators/terrain.wgsl"))
    }

    /// Writes `x + 100 * y + 10000 * z` at every sample.
    pub fn index_encoding() -> Self {
        Self::from_wgsl(
            "index encoding",
            include_str!("shaders/evaluators/index_encoding.wgsl"),
        )
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Exact WGSL spelling of an `f32`, including non-finite values.
fn f32_literal(value: f32) -> String {
    format!("bitcast<f32>({:#010x}u)", value.to_bits())
}

/// Builder for the slice pass shader module.
pub struct ShaderBuilder {
    prelude: String,
    evaluator_source: Option<String>,
    vertex_entry: String,
    fragment_entry: String,
    label: Option<String>,
}

impl ShaderBuilder {
    /// Creates a builder around [`SLICE_PRELUDE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            prelude: SLICE_PRELUDE.to_string(),
            evaluator_source: None,
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
            label: None,
        }
    }

    /// Sets the evaluator whose `density` function the fragment stage calls.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: &ShaderEvaluator) -> Self {
        self.evaluator_source = Some(evaluator.source.clone());
        self.label = Some(format!("density slice ({})", evaluator.label));
        self
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment_entry
    }

    /// Compiles the combined module, reporting WGSL errors instead of panicking.
    pub fn build_module(&self, context: &GpuContext) -> RenderResult<wgpu::ShaderModule> {
        let source = self.combined_source()?;

        context.scoped(
            wgpu::ErrorFilter::Validation,
            RenderError::ShaderCompilationFailed,
            |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: self.label.as_deref(),
                    source: wgpu::ShaderSource::Wgsl(source.into()),
                })
            },
        )
    }

    /// Prelude followed by the evaluator source.
    pub fn combined_source(&self) -> RenderResult<String> {
        let evaluator = self
            .evaluator_source
            .as_ref()
            .ok_or_else(|| RenderError::ShaderCompilationFailed("missing evaluator".into()))?;

        if !evaluator.contains("fn density") {
            return Err(RenderError::ShaderCompilationFailed(
                "evaluator does not define `fn density`".into(),
            ));
        }

        Ok(format!("{}\n\n{evaluator}", self.prelude))
    }
}

impl Default for ShaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

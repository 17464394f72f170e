//! Full-screen quad pass that evaluates one volume layer.

use bytemuck::Zeroable;
use voxfield_core::{LayerParams, FULL_SCREEN_QUAD};

use crate::buffer::{create_uniform_buffer, create_vertex_buffer, update_buffer};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::shader::{ShaderBuilder, ShaderEvaluator};
use crate::volume::{SliceTarget, VOLUME_FORMAT};

/// Evaluator parameters as seen by WGSL.
/// Layout must match WGSL `FieldUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct FieldUniforms {
    /// Block corner.
    pub origin: [f32; 3],
    /// Block edge length.
    pub size: f32,
    /// Distance between lattice samples.
    pub spacing: f32,
    /// Layer being rendered.
    pub layer: u32,
    /// Samples per axis.
    pub resolution: u32,
    /// Padding to 16-byte alignment.
    pub _pad: u32,
}

const _: () = assert!(std::mem::size_of::<FieldUniforms>() == 32);

impl FieldUniforms {
    pub fn new(params: &LayerParams, resolution: u32) -> Self {
        Self {
            origin: params.origin.to_array(),
            size: params.size,
            spacing: params.spacing,
            layer: params.layer,
            resolution,
            _pad: 0,
        }
    }
}

/// Static quad geometry, uploaded once and drawn for every layer.
pub struct QuadGeometry {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
}

impl QuadGeometry {
    /// Two triangles spanning normalized device coordinates.
    pub fn full_screen(device: &wgpu::Device) -> Self {
        Self {
            vertex_buffer: create_vertex_buffer(
                device,
                &FULL_SCREEN_QUAD,
                Some("Full Screen Quad Vertices"),
            ),
            vertex_count: FULL_SCREEN_QUAD.len() as u32,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Pipeline and parameter block of the slice pass.
pub struct SliceRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl SliceRenderer {
    /// Compiles the slice pass around `evaluator`.
    pub fn new(context: &GpuContext, evaluator: &ShaderEvaluator) -> RenderResult<Self> {
        let device = &context.device;
        let builder = ShaderBuilder::new().with_evaluator(evaluator);
        let shader = builder.build_module(context)?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Density Slice Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Density Slice Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        };

        let pipeline = context.scoped(
            wgpu::ErrorFilter::Validation,
            RenderError::PipelineCreationFailed,
            |device| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Density Slice Pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some(builder.vertex_entry()),
                        buffers: &[vertex_layout],
                        compilation_options: Default::default(),
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(builder.fragment_entry()),
                        targets: &[Some(wgpu::ColorTargetState {
                            format: VOLUME_FORMAT,
                            blend: None,
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        topology: wgpu::PrimitiveTopology::TriangleList,
                        cull_mode: None,
                        ..Default::default()
                    },
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            },
        )?;

        let uniform_buffer = create_uniform_buffer(
            device,
            &FieldUniforms::zeroed(),
            Some("Density Slice Uniforms"),
        );

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Density Slice Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        log::debug!("compiled slice pipeline for evaluator '{}'", evaluator.label());

        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
        })
    }

    /// Uploads evaluator parameters for the next slice.
    ///
    /// Queue writes are ordered against submissions, so a write followed by
    /// [`Self::render_slice`] is seen by that slice only.
    pub fn update_uniforms(&self, queue: &wgpu::Queue, uniforms: &FieldUniforms) {
        update_buffer(queue, &self.uniform_buffer, uniforms);
    }

    /// Draws the quad into `target` and submits the work.
    pub fn render_slice(&self, context: &GpuContext, target: &SliceTarget, quad: &QuadGeometry) {
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("density slice encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Density Slice Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view(),
                    depth_slice: Some(target.layer()),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, quad.vertex_buffer.slice(..));
            render_pass.draw(0..quad.vertex_count, 0..1);
        }

        context.queue.submit(std::iter::once(encoder.finish()));
    }
}

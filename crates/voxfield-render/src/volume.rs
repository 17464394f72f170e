//! Volume texture management: allocation, per-layer render targets and readback.

use voxfield_core::GridResolution;

use crate::buffer::{aligned_bytes_per_row, create_readback_buffer};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Texel format of every density volume.
pub const VOLUME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Usages every density volume is created with.
pub const VOLUME_USAGES: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING)
    .union(wgpu::TextureUsages::COPY_SRC);

const BYTES_PER_TEXEL: u32 = 4;

/// Volume usages that an adapter allowing `allowed` for [`VOLUME_FORMAT`] lacks.
pub fn missing_volume_usages(allowed: wgpu::TextureUsages) -> wgpu::TextureUsages {
    VOLUME_USAGES.difference(allowed)
}

/// Usages `adapter` supports for [`VOLUME_FORMAT`].
///
/// Downlevel backends (GLES, WebGL) cannot render to `R32Float` even though
/// WebGPU guarantees it.
pub fn adapter_volume_usages(adapter: &wgpu::Adapter) -> wgpu::TextureUsages {
    adapter
        .get_texture_format_features(VOLUME_FORMAT)
        .allowed_usages
}

/// A 3D single-channel float texture holding one density field.
///
/// The texture, its sampler and views are released when this is dropped.
pub struct VolumeTexture {
    texture: wgpu::Texture,
    sampled_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    resolution: GridResolution,
    bytes_per_row: u32,
}

/// One layer of a [`VolumeTexture`] bound as a color attachment.
#[derive(Debug)]
pub struct SliceTarget {
    view: wgpu::TextureView,
    layer: u32,
}

impl SliceTarget {
    /// 3D view the render pass attaches.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Depth slice of the view written by the render pass.
    pub fn layer(&self) -> u32 {
        self.layer
    }
}

impl VolumeTexture {
    /// Allocates an uninitialized `resolution³` volume.
    ///
    /// Fails when the adapter cannot render to or copy from [`VOLUME_FORMAT`],
    /// when the resolution is above `max_texture_dimension_3d`, when the
    /// readback staging buffer would exceed `max_buffer_size`, or when the
    /// device rejects the allocation.
    pub fn create(context: &GpuContext, resolution: GridResolution) -> RenderResult<Self> {
        let samples = resolution.samples();
        let limits = context.limits();

        let missing = missing_volume_usages(adapter_volume_usages(&context.adapter));
        if !missing.is_empty() {
            return Err(RenderError::UnsupportedFormat {
                format: VOLUME_FORMAT,
                missing,
            });
        }

        if samples > limits.max_texture_dimension_3d {
            return Err(RenderError::LimitExceeded {
                what: "3D texture dimension",
                requested: u64::from(samples),
                limit: u64::from(limits.max_texture_dimension_3d),
            });
        }

        let bytes_per_row = aligned_bytes_per_row(samples, BYTES_PER_TEXEL);
        let staging_size = staging_size(bytes_per_row, samples);
        if staging_size > limits.max_buffer_size {
            return Err(RenderError::LimitExceeded {
                what: "readback buffer size",
                requested: staging_size,
                limit: limits.max_buffer_size,
            });
        }

        let texture = context.scoped_allocation(
            RenderError::TextureCreationFailed,
            |device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Density Volume Texture"),
                    size: wgpu::Extent3d {
                        width: samples,
                        height: samples,
                        depth_or_array_layers: samples,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D3,
                    format: VOLUME_FORMAT,
                    usage: VOLUME_USAGES,
                    view_formats: &[],
                })
            },
        )?;

        let sampled_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Density Volume View"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        // Downstream consumers sample between lattice points.
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Density Volume Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::debug!(
            "allocated {samples}^3 volume ({} bytes per staged row)",
            bytes_per_row
        );

        Ok(Self {
            texture,
            sampled_view,
            sampler,
            resolution,
            bytes_per_row,
        })
    }

    pub fn resolution(&self) -> GridResolution {
        self.resolution
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Whole-volume view for sampling in later passes.
    pub fn sampled_view(&self) -> &wgpu::TextureView {
        &self.sampled_view
    }

    /// Linear, clamp-to-edge sampler for [`Self::sampled_view`].
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Binds `layer` as the sole color attachment of a render target.
    ///
    /// Checks the attachment the way a framebuffer completeness test would:
    /// the layer must exist, the texture must be a 3D render attachment with a
    /// renderable format, and creating the view must not raise a validation
    /// error.
    pub fn attach_slice(&self, context: &GpuContext, layer: u32) -> RenderResult<SliceTarget> {
        let incomplete = |reason: String| RenderError::AttachmentIncomplete { layer, reason };

        let depth = self.texture.depth_or_array_layers();
        if layer >= depth {
            return Err(incomplete(format!("volume has only {depth} layers")));
        }
        if self.texture.dimension() != wgpu::TextureDimension::D3 {
            return Err(incomplete("texture is not three-dimensional".into()));
        }
        if !self
            .texture
            .usage()
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(incomplete("texture lacks RENDER_ATTACHMENT usage".into()));
        }
        let format = self.texture.format();
        let renderable = context
            .adapter
            .get_texture_format_features(format)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        if !renderable {
            return Err(incomplete(format!(
                "{format:?} is not color-renderable on this adapter"
            )));
        }

        let view = context
            .scoped(wgpu::ErrorFilter::Validation, incomplete, |_| {
                self.texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("Density Slice Target"),
                    format: Some(format),
                    dimension: Some(wgpu::TextureViewDimension::D3),
                    mip_level_count: Some(1),
                    ..Default::default()
                })
            })?;

        Ok(SliceTarget { view, layer })
    }

    /// Copies the whole volume into host memory.
    ///
    /// Submits the copy, then blocks on the map; everything queued before
    /// (every slice render) completes first. Samples come back x-fastest,
    /// then y, then z, with row padding stripped.
    pub fn read_back(&self, context: &GpuContext) -> RenderResult<Vec<f32>> {
        let samples = self.resolution.samples();
        let size = staging_size(self.bytes_per_row, samples);

        let buffer = context.scoped_allocation(RenderError::BufferCreationFailed, |device| {
            create_readback_buffer(device, size, Some("Density Readback Buffer"))
        })?;

        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("density readback encoder"),
            });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.bytes_per_row),
                    rows_per_image: Some(samples),
                },
            },
            wgpu::Extent3d {
                width: samples,
                height: samples,
                depth_or_array_layers: samples,
            },
        );

        context.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        context
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?;
        rx.recv()
            .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?
            .map_err(|e| RenderError::BufferMapFailed(e.to_string()))?;

        let data = buffer_slice.get_mapped_range();
        let row_bytes = (samples * BYTES_PER_TEXEL) as usize;
        let mut values = Vec::with_capacity(self.resolution.volume_len());
        for row in data.chunks_exact(self.bytes_per_row as usize) {
            values.extend_from_slice(bytemuck::cast_slice::<u8, f32>(&row[..row_bytes]));
        }

        drop(data);
        buffer.unmap();

        Ok(values)
    }
}

fn staging_size(bytes_per_row: u32, samples: u32) -> u64 {
    u64::from(bytes_per_row) * u64::from(samples) * u64::from(samples)
}

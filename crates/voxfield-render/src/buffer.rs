//! GPU buffer helpers.

use wgpu::util::DeviceExt;

/// Creates a vertex buffer from data.
pub fn create_vertex_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

/// Creates a uniform buffer from data.
pub fn create_uniform_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    data: &T,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::bytes_of(data),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

/// Creates a mappable buffer that texture copies can land in.
pub fn create_readback_buffer(device: &wgpu::Device, size: u64, label: Option<&str>) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Overwrites the start of a buffer with `data`.
pub fn update_buffer<T: bytemuck::Pod>(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &T) {
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(data));
}

/// Row pitch for a texture-to-buffer copy, rounded up to
/// `COPY_BYTES_PER_ROW_ALIGNMENT`.
pub fn aligned_bytes_per_row(width: u32, bytes_per_texel: u32) -> u32 {
    let unaligned = width * bytes_per_texel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unaligned.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_row_pitch_alignment() {
        assert_eq!(aligned_bytes_per_row(1, 4), 256);
        assert_eq!(aligned_bytes_per_row(33, 4), 256);
        assert_eq!(aligned_bytes_per_row(64, 4), 256);
        assert_eq!(aligned_bytes_per_row(65, 4), 512);
    }

    proptest! {
        #[test]
        fn row_pitch_fits_row_and_is_aligned(width in 1u32..8192) {
            let pitch = aligned_bytes_per_row(width, 4);
            prop_assert_eq!(pitch % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
            prop_assert!(pitch >= width * 4);
            prop_assert!(pitch - width * 4 < wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        }
    }
}

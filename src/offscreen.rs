//! Offscreen rendering of an effect into an `RgbaImage`
//!
//! Uploads the source image, records the effect pass, copies the result into
//! a staging buffer with 256-byte aligned rows and reads it back.

use image::RgbaImage;

use crate::effects::{EffectParams, GpuEffectRuntime};
use crate::gpu_context::{GpuContext, GpuError, OFFSCREEN_FORMAT};

/// Row pitch for texture-to-buffer copies
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let bytes_per_row = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    bytes_per_row.div_ceil(align) * align
}

/// Strip row padding from a readback buffer
fn unpad_rows(data: &[u8], width: u32, height: u32, padded: u32) -> Vec<u8> {
    let bytes_per_row = (width * 4) as usize;
    let mut pixels = Vec::with_capacity(bytes_per_row * height as usize);
    for row in data.chunks(padded as usize).take(height as usize) {
        pixels.extend_from_slice(&row[..bytes_per_row]);
    }
    pixels
}

fn create_frame_texture(ctx: &GpuContext, label: &str, size: wgpu::Extent3d, usage: wgpu::TextureUsages) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage,
        view_formats: &[],
    })
}

/// Run a GPU effect over `image` and read the result back
pub fn render_offscreen(
    ctx: &GpuContext,
    runtime: &mut dyn GpuEffectRuntime,
    image: &RgbaImage,
    params: &EffectParams,
) -> Result<RgbaImage, GpuError> {
    let (width, height) = image.dimensions();
    let max = ctx.max_texture_dimension();
    if width == 0 || height == 0 {
        return Err(GpuError::EmptyFrame);
    }
    if width > max || height > max {
        return Err(GpuError::TextureTooLarge { width, height, max });
    }

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let input = create_frame_texture(
        ctx,
        "Lens Source Texture",
        size,
        wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    );
    ctx.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &input,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    let output = create_frame_texture(
        ctx,
        "Lens Output Texture",
        size,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
    );

    let padded = padded_bytes_per_row(width);
    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Lens Readback Buffer"),
        size: padded as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let input_view = input.create_view(&wgpu::TextureViewDescriptor::default());
    let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Lens Offscreen Encoder"),
    });

    runtime.process(
        &mut encoder,
        &ctx.device,
        &ctx.queue,
        &input_view,
        &output_view,
        (width, height),
        params,
    );

    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &output,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        size,
    );

    ctx.queue.submit(std::iter::once(encoder.finish()));

    let buffer_slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.device.poll(wgpu::Maintain::Wait);

    rx.recv().map_err(|_| GpuError::Readback)?.map_err(GpuError::BufferMap)?;

    let pixels = {
        let data = buffer_slice.get_mapped_range();
        unpad_rows(&data, width, height, padded)
    };
    staging.unmap();

    tracing::debug!(width, height, effect = runtime.effect_type(), "Offscreen frame rendered");

    RgbaImage::from_raw(width, height, pixels).ok_or(GpuError::Readback)
}

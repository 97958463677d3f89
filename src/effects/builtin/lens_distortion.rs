//! Lens Distortion Effect
//!
//! Bends a rectilinear render into a stereographic / cylindrical fisheye
//! projection. The GPU runtime runs `lens_distortion.wgsl` as a full-screen
//! pass; the CPU runtime evaluates the same transform per pixel.
//!
//! Packed parameter layout:
//! `[horizontal_fov, strength, cylindrical_ratio, address_mode, filter, border_color.rgba]`

use glam::{Vec2, Vec4};
use image::{ImageBuffer, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::camera::{LensDial, LensProjection};
use crate::distortion::{distort, DistortionParameters};
use crate::effects::traits::{CpuEffectRuntime, EffectDefinition, EffectParams, EffectProcessor, GpuEffectRuntime};
use crate::effects::types::{EffectInstance, Parameter, ParameterMeta, ParameterValue};
use crate::sampling::{to_rgba8, AddressMode, FilterMode, Sampler};
use crate::settings::LensSettings;
use crate::shaders::LENS_DISTORTION_SHADER;

/// Effect type identifier
pub const LENS_DISTORTION: &str = "lens_distortion";

const SLOT_FOV: usize = 0;
const SLOT_STRENGTH: usize = 1;
const SLOT_CYLINDRICAL: usize = 2;
const SLOT_ADDRESS: usize = 3;
const SLOT_FILTER: usize = 4;
const SLOT_BORDER: usize = 5;

/// Lens distortion effect definition
pub struct LensDistortionDefinition;

impl EffectDefinition for LensDistortionDefinition {
    fn effect_type(&self) -> &'static str {
        LENS_DISTORTION
    }

    fn display_name(&self) -> &'static str {
        "Lens Distortion"
    }

    fn category(&self) -> &'static str {
        "Distort"
    }

    fn processor(&self) -> EffectProcessor {
        EffectProcessor::Gpu
    }

    fn default_parameters(&self) -> Vec<Parameter> {
        let address_modes: Vec<&str> = AddressMode::ALL.iter().map(|m| m.name()).collect();
        let filters: Vec<&str> = FilterMode::ALL.iter().map(|m| m.name()).collect();
        let defaults = LensSettings::default();

        vec![
            Parameter::new(ParameterMeta::float(
                "horizontal_fov",
                "Horizontal FOV",
                defaults.horizontal_fov_degrees,
                1.0,
                179.0,
            )),
            Parameter::new(ParameterMeta::float("strength", "Strength", defaults.strength, 0.0, 1.0)),
            Parameter::new(ParameterMeta::float(
                "cylindrical_ratio",
                "Cylindrical Ratio",
                defaults.cylindrical_ratio,
                0.0,
                1.0,
            )),
            Parameter::new(ParameterMeta::enumeration(
                "address_mode",
                "Edges",
                &address_modes,
                defaults.address_mode.index(),
            )),
            Parameter::new(ParameterMeta::enumeration(
                "filter",
                "Filter",
                &filters,
                defaults.filter.index(),
            )),
            Parameter::new(ParameterMeta::color(
                "border_color",
                "Border Color",
                Vec4::from(defaults.border_color).to_array(),
            )),
        ]
    }

    fn create_gpu_runtime(
        &self,
        device: &wgpu::Device,
        _queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
    ) -> Option<Box<dyn GpuEffectRuntime>> {
        Some(Box::new(LensDistortionRuntime::new(device, output_format)))
    }

    fn create_cpu_runtime(&self) -> Option<Box<dyn CpuEffectRuntime>> {
        Some(Box::new(LensDistortionCpuRuntime::new()))
    }
}

/// Copy lens settings into a `lens_distortion` instance
pub fn configure_lens_instance(instance: &mut EffectInstance, settings: &LensSettings) {
    // The cylindrical ratio may extrapolate beyond the UI range
    if let Some(param) = instance.parameters.iter_mut().find(|p| p.meta.name == "cylindrical_ratio") {
        param.meta.min = None;
        param.meta.max = None;
    }

    instance.set_parameter("horizontal_fov", ParameterValue::Float(settings.horizontal_fov_degrees));
    instance.set_parameter("strength", ParameterValue::Float(settings.strength));
    instance.set_parameter("cylindrical_ratio", ParameterValue::Float(settings.cylindrical_ratio));
    instance.set_enum_option("address_mode", settings.address_mode.name());
    instance.set_enum_option("filter", settings.filter.name());
    instance.set_parameter(
        "border_color",
        ParameterValue::Color(Vec4::from(settings.border_color).to_array()),
    );
}

/// Lens state decoded from packed parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensEffectState {
    pub dial: LensDial,
    pub sampler: Sampler,
}

impl LensEffectState {
    pub fn from_params(params: &EffectParams) -> Self {
        Self {
            dial: LensDial {
                horizontal_fov_degrees: params.float(SLOT_FOV),
                strength: params.float(SLOT_STRENGTH),
                cylindrical_ratio: params.float(SLOT_CYLINDRICAL),
            },
            sampler: Sampler::new(
                AddressMode::from_index(params.float(SLOT_ADDRESS).round().max(0.0) as usize),
                FilterMode::from_index(params.float(SLOT_FILTER).round().max(0.0) as usize),
                Vec4::from_array(params.color(SLOT_BORDER)),
            ),
        }
    }
}

/// Bring a cached projection up to date, returning the parameters to render with
///
/// Returns None (and logs) when the dial is invalid; callers pass the frame through.
fn refresh_projection(
    projection: &mut Option<LensProjection>,
    dial: LensDial,
    width: u32,
    height: u32,
) -> Option<DistortionParameters> {
    let result = match projection {
        Some(existing) => existing.update(dial, width, height).map(|_| *existing.params()),
        None => LensProjection::new(dial, width, height).map(|created| {
            let params = *created.params();
            *projection = Some(created);
            params
        }),
    };

    match result {
        Ok(params) => Some(params),
        Err(e) => {
            tracing::warn!("Lens distortion disabled: {}", e);
            None
        }
    }
}

/// Resample `source` through the lens into a tightly packed RGBA8 `output`
///
/// Rows are processed in parallel; each pixel is sampled at its center.
pub fn resample_into<C>(
    params: &DistortionParameters,
    sampler: &Sampler,
    source: &ImageBuffer<Rgba<u8>, C>,
    output: &mut [u8],
    width: u32,
    height: u32,
) where
    C: std::ops::Deref<Target = [u8]> + Sync,
{
    let row_bytes = width as usize * 4;
    if row_bytes == 0 {
        return;
    }
    let (w, h) = (width as f32, height as f32);

    output
        .par_chunks_mut(row_bytes)
        .take(height as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let v = (y as f32 + 0.5) / h;
            for (x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let uv = Vec2::new((x as f32 + 0.5) / w, v);
                let color = sampler.sample_projective(source, distort(params, uv));
                pixel.copy_from_slice(&to_rgba8(color));
            }
        });
}

/// Distort a whole image on the CPU
pub fn distort_image(image: &RgbaImage, params: &DistortionParameters, sampler: &Sampler) -> RgbaImage {
    let (width, height) = image.dimensions();
    let mut output = RgbaImage::new(width, height);
    resample_into(params, sampler, image, &mut output, width, height);
    output
}

/// CPU runtime for the lens distortion effect
#[derive(Default)]
pub struct LensDistortionCpuRuntime {
    projection: Option<LensProjection>,
}

impl LensDistortionCpuRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CpuEffectRuntime for LensDistortionCpuRuntime {
    fn process(&mut self, input: &[u8], output: &mut [u8], width: u32, height: u32, params: &EffectParams) {
        let expected = width as usize * height as usize * 4;
        if input.len() != expected || output.len() != expected {
            tracing::warn!(
                input = input.len(),
                output = output.len(),
                expected,
                "Lens distortion frame size mismatch"
            );
            return;
        }
        if expected == 0 {
            return;
        }

        let state = LensEffectState::from_params(params);
        let Some(lens) = refresh_projection(&mut self.projection, state.dial, width, height) else {
            output.copy_from_slice(input);
            return;
        };

        let Some(source) = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width, height, input) else {
            output.copy_from_slice(input);
            return;
        };
        resample_into(&lens, &state.sampler, &source, output, width, height);
    }

    fn effect_type(&self) -> &'static str {
        LENS_DISTORTION
    }
}

/// Uniform block of `lens_distortion.wgsl`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LensUniforms {
    pub strength: f32,
    pub height: f32,
    pub aspect_ratio: f32,
    pub cylindrical_ratio: f32,
    pub border_color: [f32; 4],
    /// 1.0 when out-of-range samples take the border color
    pub use_border: f32,
    pub _pad: [f32; 3],
}

impl LensUniforms {
    pub fn new(params: &DistortionParameters, sampler: &Sampler) -> Self {
        Self {
            strength: params.strength(),
            height: params.height(),
            aspect_ratio: params.aspect_ratio(),
            cylindrical_ratio: params.cylindrical_ratio(),
            border_color: sampler.border_color.to_array(),
            use_border: if sampler.address_mode == AddressMode::ClampToBorder {
                1.0
            } else {
                0.0
            },
            _pad: [0.0; 3],
        }
    }
}

/// GPU runtime for the lens distortion effect
pub struct LensDistortionRuntime {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    sampler_key: (AddressMode, FilterMode),
    output_format: wgpu::TextureFormat,
    projection: Option<LensProjection>,
}

impl LensDistortionRuntime {
    /// Create a new lens distortion runtime
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lens Distortion Bind Group Layout"),
            entries: &[
                // Rectilinear source
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Lens uniforms, read by both stages
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<LensUniforms>() as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline = create_pipeline(device, &bind_group_layout, output_format, LENS_DISTORTION_SHADER);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lens Distortion Uniforms"),
            size: std::mem::size_of::<LensUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler_key = (AddressMode::default(), FilterMode::default());
        let sampler = create_sampler(device, sampler_key);

        tracing::info!(format = ?output_format, "Lens distortion GPU runtime created");

        Self {
            pipeline,
            bind_group_layout,
            uniform_buffer,
            sampler,
            sampler_key,
            output_format,
            projection: None,
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    output_format: wgpu::TextureFormat,
    shader_source: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Lens Distortion Shader"),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Lens Distortion Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Lens Distortion Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_sampler(device: &wgpu::Device, (address_mode, filter): (AddressMode, FilterMode)) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Lens Distortion Sampler"),
        address_mode_u: address_mode.to_wgpu(),
        address_mode_v: address_mode.to_wgpu(),
        address_mode_w: address_mode.to_wgpu(),
        mag_filter: filter.to_wgpu(),
        min_filter: filter.to_wgpu(),
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

impl GpuEffectRuntime for LensDistortionRuntime {
    fn process(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
        size: (u32, u32),
        params: &EffectParams,
    ) {
        let state = LensEffectState::from_params(params);

        // An invalid dial renders the identity
        let lens = refresh_projection(&mut self.projection, state.dial, size.0, size.1)
            .or_else(|| DistortionParameters::identity(size.0.max(1) as f32 / size.1.max(1) as f32).ok());
        let Some(lens) = lens else {
            return;
        };

        let uniforms = LensUniforms::new(&lens, &state.sampler);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let key = (state.sampler.address_mode, state.sampler.filter);
        if key != self.sampler_key {
            self.sampler = create_sampler(device, key);
            self.sampler_key = key;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lens Distortion Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lens Distortion Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }

    fn rebuild(&mut self, device: &wgpu::Device, shader_source: &str) -> Result<(), String> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = create_pipeline(device, &self.bind_group_layout, self.output_format, shader_source);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(error.to_string());
        }

        self.pipeline = pipeline;
        tracing::info!("Lens distortion pipeline rebuilt");
        Ok(())
    }

    fn effect_type(&self) -> &'static str {
        LENS_DISTORTION
    }
}

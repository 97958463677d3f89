//! Effect traits and runtime interfaces
//!
//! - `EffectDefinition` - Factory trait for creating effect runtimes
//! - `GpuEffectRuntime` - Runtime trait for wgpu shader-based processing
//! - `CpuEffectRuntime` - Runtime trait for CPU processing of RGBA8 frames

use super::{Parameter, ParameterValue};

/// The preferred processor of an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectProcessor {
    /// GPU shader-based effect
    Gpu,
    /// CPU-based effect
    Cpu,
}

/// Packed effect parameters
///
/// Parameters are packed in declaration order: floats directly, enums as
/// their index, colors as 4 consecutive values.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectParams {
    pub params: [f32; 16],
}

impl Default for EffectParams {
    fn default() -> Self {
        Self { params: [0.0; 16] }
    }
}

impl EffectParams {
    /// Set a float parameter at the given index
    pub fn set_float(&mut self, index: usize, value: f32) {
        if index < self.params.len() {
            self.params[index] = value;
        }
    }

    /// Set a color (vec4) parameter starting at the given index
    pub fn set_color(&mut self, index: usize, value: [f32; 4]) {
        if index + 3 < self.params.len() {
            self.params[index..index + 4].copy_from_slice(&value);
        }
    }

    /// Read a float slot, 0.0 when out of range
    pub fn float(&self, index: usize) -> f32 {
        self.params.get(index).copied().unwrap_or(0.0)
    }

    /// Read a color starting at the given slot
    pub fn color(&self, index: usize) -> [f32; 4] {
        let mut out = [0.0; 4];
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.float(index + i);
        }
        out
    }

    /// Pack parameters, returning the number of floats used
    pub fn pack_parameters(&mut self, parameters: &[Parameter]) -> usize {
        let mut offset = 0;
        for param in parameters {
            if offset + param.value.slot_count() > self.params.len() {
                tracing::warn!(parameter = %param.meta.name, "Effect parameter slots exhausted");
                break;
            }
            match &param.value {
                ParameterValue::Color(v) => self.set_color(offset, *v),
                other => self.set_float(offset, other.as_f32()),
            }
            offset += param.value.slot_count();
        }
        offset
    }

    /// Pack from a parameter list into a fresh value
    pub fn from_parameters(parameters: &[Parameter]) -> Self {
        let mut params = Self::default();
        params.pack_parameters(parameters);
        params
    }
}

/// Trait for effect definitions (factory pattern)
///
/// Each effect type implements this trait to provide metadata and create
/// runtime instances. Effects are registered with the `EffectRegistry`.
pub trait EffectDefinition: Send + Sync {
    /// Unique identifier for this effect type (e.g., "lens_distortion")
    fn effect_type(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Category for grouping (e.g., "Distort")
    fn category(&self) -> &'static str;

    /// Preferred processor
    fn processor(&self) -> EffectProcessor;

    /// Default parameters for this effect
    fn default_parameters(&self) -> Vec<Parameter>;

    /// Create a GPU runtime instance, None if the effect is CPU-only
    fn create_gpu_runtime(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        output_format: wgpu::TextureFormat,
    ) -> Option<Box<dyn GpuEffectRuntime>>;

    /// Create a CPU runtime instance, None if the effect is GPU-only
    fn create_cpu_runtime(&self) -> Option<Box<dyn CpuEffectRuntime>>;
}

/// Runtime trait for GPU shader-based effects
///
/// The effect reads from an input texture and writes to an output texture of
/// the same size.
pub trait GpuEffectRuntime: Send {
    /// Record the effect pass
    ///
    /// # Arguments
    /// * `encoder` - Command encoder for recording GPU commands
    /// * `device` - GPU device for resource creation
    /// * `queue` - GPU queue for buffer writes
    /// * `input` - Input texture view to read from
    /// * `output` - Output texture view to write to
    /// * `size` - Output size in pixels
    /// * `params` - Packed effect parameters
    #[allow(clippy::too_many_arguments)]
    fn process(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        input: &wgpu::TextureView,
        output: &wgpu::TextureView,
        size: (u32, u32),
        params: &EffectParams,
    );

    /// Rebuild the pipeline from new WGSL source (hot-reload)
    fn rebuild(&mut self, device: &wgpu::Device, shader_source: &str) -> Result<(), String>;

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;
}

/// Runtime trait for CPU-based effects
///
/// Frames are tightly packed RGBA8, `width * height * 4` bytes.
pub trait CpuEffectRuntime: Send {
    /// Process a frame through the effect
    fn process(&mut self, input: &[u8], output: &mut [u8], width: u32, height: u32, params: &EffectParams);

    /// Get the effect type identifier
    fn effect_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ParameterMeta;

    #[test]
    fn test_effect_params_default() {
        let params = EffectParams::default();
        assert!(params.params.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_effect_params_pack() {
        let parameters = vec![
            Parameter::new(ParameterMeta::float("a", "A", 0.5, 0.0, 1.0)),
            Parameter::new(ParameterMeta::enumeration("b", "B", &["off", "on"], 1)),
            Parameter::new(ParameterMeta::color("c", "C", [0.1, 0.2, 0.3, 1.0])),
            Parameter::new(ParameterMeta::enumeration("d", "D", &["x", "y"], 1)),
        ];

        let mut params = EffectParams::default();
        let used = params.pack_parameters(&parameters);

        assert_eq!(used, 7);
        assert_eq!(params.float(0), 0.5);
        assert_eq!(params.float(1), 1.0);
        assert_eq!(params.color(2), [0.1, 0.2, 0.3, 1.0]);
        assert_eq!(params.float(6), 1.0);
    }

    #[test]
    fn test_effect_params_overflow_stops() {
        let parameters: Vec<Parameter> = (0..5)
            .map(|_| Parameter::new(ParameterMeta::color("c", "C", [1.0; 4])))
            .collect();
        let mut params = EffectParams::default();
        assert_eq!(params.pack_parameters(&parameters), 16);
        assert_eq!(params.float(99), 0.0);
    }
}

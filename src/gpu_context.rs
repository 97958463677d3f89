//! Headless GPU context
//!
//! Owns the wgpu instance, adapter, device and queue used for offscreen
//! rendering. No surface is needed: the lens pass renders into a texture
//! that is read back to the CPU.

/// GPU-related errors
#[derive(Debug)]
pub enum GpuError {
    /// No adapter matched the request
    NoAdapter,
    /// The adapter refused to create a device
    RequestDevice(wgpu::RequestDeviceError),
    /// Mapping the readback buffer failed
    BufferMap(wgpu::BufferAsyncError),
    /// The readback callback never fired
    Readback,
    /// The frame has no pixels
    EmptyFrame,
    /// The frame exceeds the device texture limit
    TextureTooLarge { width: u32, height: u32, max: u32 },
    /// The effect has no GPU runtime
    NoRuntime(String),
    /// A replacement shader failed validation
    ShaderRebuild(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No suitable GPU adapter found"),
            GpuError::RequestDevice(e) => write!(f, "Failed to create device: {}", e),
            GpuError::BufferMap(e) => write!(f, "Failed to map readback buffer: {}", e),
            GpuError::Readback => write!(f, "GPU readback did not complete"),
            GpuError::EmptyFrame => write!(f, "Frame has no pixels"),
            GpuError::TextureTooLarge { width, height, max } => {
                write!(f, "Frame {}x{} exceeds the GPU texture limit of {}", width, height, max)
            }
            GpuError::NoRuntime(effect) => write!(f, "Effect '{}' has no GPU runtime", effect),
            GpuError::ShaderRebuild(e) => write!(f, "Shader rebuild failed: {}", e),
        }
    }
}

impl std::error::Error for GpuError {}

/// Texture format used for offscreen rendering
///
/// Linear (non-sRGB) so the GPU filters the same byte values the CPU sampler does.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// GPU resources for headless rendering
pub struct GpuContext {
    /// The wgpu instance
    pub instance: wgpu::Instance,
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a context without a window
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        tracing::info!("Using GPU: {}", adapter.get_info().name);
        tracing::info!("Backend: {:?}", adapter.get_info().backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Lens Distortion Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(GpuError::RequestDevice)?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Largest texture side the device accepts
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = GpuError::TextureTooLarge {
            width: 10000,
            height: 20,
            max: 8192,
        };
        assert_eq!(e.to_string(), "Frame 10000x20 exceeds the GPU texture limit of 8192");
        assert_eq!(
            GpuError::NoRuntime("blur".into()).to_string(),
            "Effect 'blur' has no GPU runtime"
        );
    }

    #[test]
    fn test_offscreen_format_is_linear() {
        assert!(!OFFSCREEN_FORMAT.is_srgb());
    }
}

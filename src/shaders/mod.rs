//! Shader sources
//!
//! The lens shader is embedded in the binary. A replacement can be read from
//! disk and handed to `GpuEffectRuntime::rebuild`.

use std::path::Path;

/// The embedded lens distortion shader
pub const LENS_DISTORTION_SHADER: &str = include_str!("lens_distortion.wgsl");

/// Read replacement WGSL source from `path`
pub fn load_shader(path: &Path) -> Result<String, std::io::Error> {
    let source = std::fs::read_to_string(path)?;
    tracing::info!("Loaded shader {} ({} bytes)", path.display(), source.len());
    Ok(source)
}

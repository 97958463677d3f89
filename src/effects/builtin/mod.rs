//! Built-in effects

mod lens_distortion;

pub use lens_distortion::{
    configure_lens_instance, distort_image, LensDistortionCpuRuntime, LensDistortionDefinition, LensDistortionRuntime,
    LensEffectState, LensUniforms, LENS_DISTORTION,
};

use super::EffectRegistry;

/// Register all built-in effects with the registry
pub fn register_builtin_effects(registry: &mut EffectRegistry) {
    registry.register(LensDistortionDefinition);
}

//! Effects system
//!
//! Post-process effects applied to a rendered frame, processed on the GPU
//! with wgpu or on the CPU over RGBA8 buffers.
//!
//! # Architecture
//!
//! - **Data types** (`types.rs`): `Parameter`, `ParameterMeta`, `EffectInstance`
//! - **Traits** (`traits.rs`): `EffectDefinition` factories and the
//!   `GpuEffectRuntime`/`CpuEffectRuntime` processing traits
//! - **Registry** (`registry.rs`): central registry of available effects
//! - **Builtin** (`builtin/`): built-in effects (lens_distortion)
//!
//! # Usage
//!
//! ```
//! use lens_distortion::effects::{builtin, EffectParams, EffectRegistry, ParameterValue};
//!
//! let mut registry = EffectRegistry::new();
//! builtin::register_builtin_effects(&mut registry);
//!
//! let mut instance = registry.create_instance("lens_distortion").unwrap();
//! instance.set_parameter("strength", ParameterValue::Float(0.5));
//!
//! let mut runtime = registry.create_cpu_runtime("lens_distortion").unwrap();
//! let input = vec![255u8; 8 * 4 * 4];
//! let mut output = vec![0u8; input.len()];
//! runtime.process(&input, &mut output, 8, 4, &EffectParams::from_parameters(&instance.parameters));
//! assert_eq!(output, input);
//! ```

mod registry;
mod traits;
mod types;
pub mod builtin;

pub use registry::*;
pub use traits::*;
pub use types::*;

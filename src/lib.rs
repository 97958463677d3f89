//! Lens Distortion Library
//!
//! Fisheye post-process for rectilinear renders. A scene rendered with an
//! ordinary perspective camera is resampled so that it reads as a
//! stereographic (or partially cylindrical) projection, allowing fields of
//! view well beyond what a rectilinear camera can show without stretching.
//!
//! The transform lives in [`distortion`]; [`camera`] derives its parameters
//! from the user-facing dial; [`effects`] runs it on the CPU or with wgpu.

pub mod camera;
pub mod distortion;
pub mod effects;
pub mod gpu_context;
pub mod offscreen;
pub mod sampling;
pub mod settings;
pub mod shaders;
pub mod telemetry;

pub use camera::{LensDial, LensProjection};
pub use distortion::{distort, DistortionError, DistortionParameters, ProjectiveSample, ScreenCoordinate};
pub use gpu_context::{GpuContext, GpuError};
pub use sampling::{AddressMode, FilterMode, Sampler};
pub use settings::{LensSettings, SettingsError};

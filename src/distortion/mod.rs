//! Lens-distortion transform
//!
//! Remaps a rectilinear perspective render into a stereographic /
//! cylindrical fisheye-like projection. Parameterized by strength, the
//! vertical half-FOV tangent, aspect ratio and a cylindrical/spherical blend.
//!
//! # Usage
//!
//! ```
//! use glam::Vec2;
//! use lens_distortion::distortion::{distort, resolve_sample, DistortionParameters};
//!
//! let params = DistortionParameters::from_horizontal_fov(140.0, 16.0 / 9.0, 1.0, 0.25).unwrap();
//! let sample = distort(&params, Vec2::new(0.25, 0.75));
//! let source_uv = resolve_sample(sample);
//! assert!(source_uv.is_finite());
//! ```

mod params;
mod transform;

pub use params::*;
pub use transform::*;

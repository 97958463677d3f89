//! The lens-distortion transform
//!
//! The transform is split the same way the shader is:
//!
//! - `vertex_stage` produces `LensVaryings`, the values a rasterizer would
//!   interpolate across the full-screen primitive. `uv` is affine and `uv_dot`
//!   is linear in the input coordinate, so interpolation is exact.
//! - `LensVaryings::finish` is the per-fragment step. It yields a homogeneous
//!   `ProjectiveSample`; the divide by `w` happens last, per pixel.
//!
//! Screen coordinates have their origin at the top-left corner with `v`
//! growing downward, matching wgpu texture space and `image` row order.

use glam::{Vec2, Vec3};

use super::DistortionParameters;

/// Normalized texture-space coordinate in [0, 1]²
pub type ScreenCoordinate = Vec2;

/// Homogeneous sampling coordinate `(u*w, v*w, w)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectiveSample(pub Vec3);

impl ProjectiveSample {
    /// Homogeneous divisor
    pub fn w(&self) -> f32 {
        self.0.z
    }

    /// Perspective divide
    pub fn resolve(&self) -> ScreenCoordinate {
        debug_assert!(self.0.z != 0.0, "projective sample with w = 0");
        Vec2::new(self.0.x / self.0.z, self.0.y / self.0.z)
    }
}

/// Vertex-stage outputs of the transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensVaryings {
    /// Unnormalized projective coordinate before the fragment correction
    pub uv: Vec3,
    /// Radial bend vector; its squared length drives the fragment correction
    pub uv_dot: Vec2,
}

impl LensVaryings {
    /// Fragment step: `dot(uv_dot, uv_dot) * (-0.5, -0.5, -1) + uv`
    pub fn finish(&self) -> ProjectiveSample {
        let bend = self.uv_dot.dot(self.uv_dot);
        ProjectiveSample(bend * Vec3::new(-0.5, -0.5, -1.0) + self.uv)
    }

    /// Barycentric interpolation across a triangle, as a rasterizer does
    pub fn interpolate(vertices: &[LensVaryings; 3], barycentric: Vec3) -> Self {
        Self {
            uv: vertices[0].uv * barycentric.x
                + vertices[1].uv * barycentric.y
                + vertices[2].uv * barycentric.z,
            uv_dot: vertices[0].uv_dot * barycentric.x
                + vertices[1].uv_dot * barycentric.y
                + vertices[2].uv_dot * barycentric.z,
        }
    }
}

/// Per-vertex half of the transform
pub fn vertex_stage(params: &DistortionParameters, uv: ScreenCoordinate) -> LensVaryings {
    debug_assert!(uv.is_finite(), "non-finite screen coordinate {uv:?}");

    let signed_uv = 2.0 * uv - Vec2::ONE;

    let scaled_height = params.strength() * params.height();
    let cyl_aspect = params.aspect_ratio() * params.cylindrical_ratio();
    let aspect_diag_sq = params.aspect_ratio() * params.aspect_ratio() + 1.0;
    let diag_sq = scaled_height * scaled_height * aspect_diag_sq;

    let z = 0.5 * (diag_sq + 1.0).sqrt() + 0.5;
    let ny = (z - 1.0) / (cyl_aspect * cyl_aspect + 1.0);

    // ny is never negative analytically; rounding near z = 1 can make it so
    let uv_dot = ny.max(0.0).sqrt() * Vec2::new(cyl_aspect, 1.0) * signed_uv;
    let xy = Vec2::splat(0.5) * z + Vec2::splat(-0.5) + uv;

    LensVaryings {
        uv: xy.extend(z),
        uv_dot,
    }
}

/// Map an output coordinate to the projective sample of the rectilinear source
pub fn distort(params: &DistortionParameters, uv: ScreenCoordinate) -> ProjectiveSample {
    vertex_stage(params, uv).finish()
}

/// Perspective divide of a projective sample
pub fn resolve_sample(sample: ProjectiveSample) -> ScreenCoordinate {
    sample.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).abs().max_element() < EPS
    }

    fn grid() -> impl Iterator<Item = Vec2> {
        (0..=10).flat_map(|i| (0..=10).map(move |j| Vec2::new(i as f32 / 10.0, j as f32 / 10.0)))
    }

    #[test]
    fn test_identity_at_zero_strength() {
        for &(height, aspect, ratio) in &[(1.0, 1.0, 0.0), (1.19, 1.777, 1.0), (0.3, 0.5, 2.0)] {
            let params = DistortionParameters::new(0.0, height, aspect, ratio).unwrap();
            for uv in grid() {
                let varyings = vertex_stage(&params, uv);
                assert_eq!(varyings.uv_dot, Vec2::ZERO);
                assert_eq!(varyings.uv.z, 1.0);
                assert!(approx(resolve_sample(distort(&params, uv)), uv));
            }
        }
    }

    #[test]
    fn test_center_is_fixed_point() {
        let params = DistortionParameters::new(0.5, 1.1918, 1.777, 1.0).unwrap();
        let center = Vec2::splat(0.5);
        let varyings = vertex_stage(&params, center);

        assert_eq!(varyings.uv_dot, Vec2::ZERO);
        let z = varyings.uv.z;
        assert!(z > 1.0);
        assert!((varyings.uv.x - 0.5 * z).abs() < EPS);
        assert!((varyings.uv.y - 0.5 * z).abs() < EPS);
        assert!(approx(distort(&params, center).resolve(), center));
    }

    #[test]
    fn test_zero_strength_scenario() {
        let params = DistortionParameters::new(0.0, 3.7, 1.5, 0.5).unwrap();
        let uv = Vec2::new(0.1, 0.9);
        assert!(approx(resolve_sample(distort(&params, uv)), uv));
    }

    #[test]
    fn test_cylindrical_bends_vertical_axis_only() {
        let params = DistortionParameters::new(1.0, 1.0, 1.0, 0.0).unwrap();

        // Right edge on the horizontal midline: no bend at all
        let right = vertex_stage(&params, Vec2::new(1.0, 0.5));
        assert_eq!(right.uv_dot.y, 0.0);
        assert_eq!(right.uv_dot.x, 0.0);

        // Bottom edge on the vertical midline: bend is vertical
        let bottom = vertex_stage(&params, Vec2::new(0.5, 1.0));
        assert_eq!(bottom.uv_dot.x, 0.0);
        assert!(bottom.uv_dot.y != 0.0);

        // The divide still pulls the right edge inward
        let resolved = distort(&params, Vec2::new(1.0, 0.5)).resolve();
        assert!(resolved.x < 1.0);
        assert!((resolved.y - 0.5).abs() < EPS);
    }

    #[test]
    fn test_point_symmetry() {
        for &ratio in &[0.0, 0.25, 1.0, 1.5] {
            let params = DistortionParameters::new(0.8, 1.3, 1.6, ratio).unwrap();
            for uv in grid() {
                let a = distort(&params, uv).resolve();
                let b = distort(&params, Vec2::ONE - uv).resolve();
                assert!(approx(a + b, Vec2::ONE), "ratio {ratio} uv {uv:?}: {a:?} {b:?}");

                let da = vertex_stage(&params, uv).uv_dot;
                let db = vertex_stage(&params, Vec2::ONE - uv).uv_dot;
                assert!(approx(da, -db));
            }
        }
    }

    #[test]
    fn test_z_and_ny_bounds() {
        for strength in [0.0, 0.1, 0.5, 0.9, 1.0] {
            for height in [0.01, 0.5, 1.0, 5.0] {
                for aspect in [0.25, 1.0, 2.4] {
                    for ratio in [-1.0, 0.0, 0.5, 1.0, 3.0] {
                        let params = DistortionParameters::new(strength, height, aspect, ratio).unwrap();
                        let varyings = vertex_stage(&params, Vec2::new(0.2, 0.7));
                        assert!(varyings.uv.z >= 1.0);
                        assert!(varyings.uv_dot.is_finite());
                    }
                }
            }
        }
    }

    #[test]
    fn test_divisor_at_least_one_inside_unit_square() {
        for ratio in [0.0, 0.25, 1.0, 2.0] {
            let params = DistortionParameters::new(1.0, 2.0, 1.777, ratio).unwrap();
            for uv in grid() {
                assert!(distort(&params, uv).w() >= 1.0 - EPS, "ratio {ratio} uv {uv:?}");
            }
        }
    }

    #[test]
    fn test_bending_grows_with_strength() {
        let uvs = [Vec2::new(0.9, 0.5), Vec2::new(0.5, 0.1), Vec2::new(0.0, 1.0)];
        for ratio in [0.25, 1.0] {
            for uv in uvs {
                let mut previous = -1.0;
                for step in 0..=10 {
                    let strength = step as f32 / 10.0;
                    let params = DistortionParameters::new(strength, 1.19, 1.777, ratio).unwrap();
                    let magnitude = vertex_stage(&params, uv).uv_dot.length();
                    assert!(magnitude > previous, "strength {strength} uv {uv:?}");
                    previous = magnitude;
                }
            }
        }
    }

    #[test]
    fn test_interpolated_varyings_match_direct_evaluation() {
        let params = DistortionParameters::new(0.7, 1.19, 1.777, 0.25).unwrap();

        // Full-screen triangle covering the unit square
        let corners = [Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(0.0, 2.0)];
        let vertices = corners.map(|c| vertex_stage(&params, c));

        for uv in grid() {
            let barycentric = Vec3::new(1.0 - uv.x / 2.0 - uv.y / 2.0, uv.x / 2.0, uv.y / 2.0);
            let interpolated = LensVaryings::interpolate(&vertices, barycentric).finish().resolve();
            let direct = distort(&params, uv).resolve();
            assert!((interpolated - direct).abs().max_element() < 1e-4, "uv {uv:?}");
        }
    }
}

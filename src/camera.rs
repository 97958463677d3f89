//! Lens projection state
//!
//! Turns the user-facing dial (horizontal FOV, strength, cylindrical ratio)
//! and the viewport size into `DistortionParameters` plus the vertical FOV the
//! scene camera must render with. The trigonometry runs only when the dial or
//! the viewport changes, never per frame.

use crate::distortion::{DistortionError, DistortionParameters};

/// User-facing lens controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LensDial {
    /// Horizontal field of view covered by the distorted output, in degrees
    pub horizontal_fov_degrees: f32,
    /// 0 = rectilinear, 1 = stereographic
    pub strength: f32,
    /// 0 = cylindrical, 1 = spherical
    pub cylindrical_ratio: f32,
}

impl Default for LensDial {
    fn default() -> Self {
        Self {
            horizontal_fov_degrees: 140.0,
            strength: 1.0,
            cylindrical_ratio: 0.25,
        }
    }
}

/// Cached projection for one viewport
#[derive(Debug, Clone, Copy)]
pub struct LensProjection {
    dial: LensDial,
    width: u32,
    height: u32,
    params: DistortionParameters,
}

impl LensProjection {
    /// Build the projection for a viewport of `width` x `height` pixels
    pub fn new(dial: LensDial, width: u32, height: u32) -> Result<Self, DistortionError> {
        let params = Self::derive(&dial, width, height)?;
        Ok(Self {
            dial,
            width,
            height,
            params,
        })
    }

    /// Update the lens dial and the viewport together
    ///
    /// Parameters are derived at most once. Returns `Ok(true)` when they were
    /// recomputed; on error the previous state is kept.
    pub fn update(&mut self, dial: LensDial, width: u32, height: u32) -> Result<bool, DistortionError> {
        if dial == self.dial && width == self.width && height == self.height {
            return Ok(false);
        }
        self.params = Self::derive(&dial, width, height)?;
        self.dial = dial;
        self.width = width;
        self.height = height;
        Ok(true)
    }

    /// Update the viewport size
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool, DistortionError> {
        self.update(self.dial, width, height)
    }

    /// Update the lens dial
    pub fn set_dial(&mut self, dial: LensDial) -> Result<bool, DistortionError> {
        self.update(dial, self.width, self.height)
    }

    pub fn params(&self) -> &DistortionParameters {
        &self.params
    }

    pub fn dial(&self) -> &LensDial {
        &self.dial
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.params.aspect_ratio()
    }

    /// Vertical FOV (degrees) for the perspective camera rendering the source
    pub fn vertical_fov_degrees(&self) -> f32 {
        self.params.vertical_fov_degrees()
    }

    fn derive(dial: &LensDial, width: u32, height: u32) -> Result<DistortionParameters, DistortionError> {
        let aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        let params = DistortionParameters::from_horizontal_fov(
            dial.horizontal_fov_degrees,
            aspect_ratio,
            dial.strength,
            dial.cylindrical_ratio,
        )?;
        tracing::debug!(
            width,
            height,
            height_tan = params.height(),
            vertical_fov = params.vertical_fov_degrees(),
            "Lens parameters derived"
        );
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dial() {
        let dial = LensDial::default();
        assert_eq!(dial.horizontal_fov_degrees, 140.0);
        assert_eq!(dial.strength, 1.0);
        assert_eq!(dial.cylindrical_ratio, 0.25);
    }

    #[test]
    fn test_projection_derives_height() {
        let projection = LensProjection::new(LensDial::default(), 1920, 1080).unwrap();
        let aspect = 1920.0 / 1080.0;
        let expected = (70.0f32.to_radians()).tan() / aspect;
        assert!((projection.params().height() - expected).abs() < 1e-6);
        assert!((projection.aspect_ratio() - aspect).abs() < 1e-6);

        let vfov = projection.vertical_fov_degrees();
        assert!((vfov - (expected.atan() * 2.0).to_degrees()).abs() < 1e-4);
        assert!(vfov < 140.0);
    }

    #[test]
    fn test_resize_recomputes_only_on_change() {
        let mut projection = LensProjection::new(LensDial::default(), 800, 600).unwrap();
        let before = *projection.params();

        assert_eq!(projection.resize(800, 600), Ok(false));
        assert_eq!(*projection.params(), before);

        assert_eq!(projection.resize(1200, 600), Ok(true));
        assert_eq!(projection.dimensions(), (1200, 600));
        assert!(projection.params().height() < before.height());
    }

    #[test]
    fn test_invalid_dial_keeps_previous_state() {
        let mut projection = LensProjection::new(LensDial::default(), 800, 600).unwrap();
        let before = *projection.params();

        let bad = LensDial {
            strength: 2.0,
            ..LensDial::default()
        };
        assert!(projection.set_dial(bad).is_err());
        assert_eq!(*projection.params(), before);
        assert_eq!(*projection.dial(), LensDial::default());
    }

    #[test]
    fn test_update_applies_dial_and_size_together() {
        let mut projection = LensProjection::new(LensDial::default(), 800, 600).unwrap();
        let dial = LensDial {
            horizontal_fov_degrees: 100.0,
            strength: 0.5,
            cylindrical_ratio: 1.0,
        };

        assert_eq!(projection.update(dial, 1920, 1080), Ok(true));
        let fresh = LensProjection::new(dial, 1920, 1080).unwrap();
        assert_eq!(projection.params(), fresh.params());
        assert_eq!(projection.dimensions(), (1920, 1080));
        assert_eq!(projection.update(dial, 1920, 1080), Ok(false));

        let bad = LensDial {
            horizontal_fov_degrees: 180.0,
            ..dial
        };
        assert!(projection.update(bad, 640, 480).is_err());
        assert_eq!(projection.dimensions(), (1920, 1080));
        assert_eq!(*projection.dial(), dial);
    }

    #[test]
    fn test_zero_sized_viewport_is_clamped() {
        let projection = LensProjection::new(LensDial::default(), 0, 0).unwrap();
        assert_eq!(projection.aspect_ratio(), 1.0);
    }
}

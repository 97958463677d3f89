//! Distortion parameters
//!
//! `DistortionParameters` is the validated input of the lens transform.
//! Construction is the only place preconditions are checked; the per-sample
//! path assumes finite values.

/// Errors raised when building `DistortionParameters`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistortionError {
    /// A parameter was NaN or infinite
    NonFinite(&'static str),
    /// Strength must lie in [0, 1]
    StrengthOutOfRange(f32),
    /// Height (vertical half-FOV tangent) must be positive
    NonPositiveHeight(f32),
    /// Aspect ratio (width / height) must be positive
    NonPositiveAspectRatio(f32),
    /// Horizontal field of view must lie in (0, 180) degrees
    FieldOfViewOutOfRange(f32),
}

impl std::fmt::Display for DistortionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistortionError::NonFinite(name) => write!(f, "Parameter '{}' is not finite", name),
            DistortionError::StrengthOutOfRange(v) => {
                write!(f, "Strength {} is outside [0, 1]", v)
            }
            DistortionError::NonPositiveHeight(v) => write!(f, "Height {} must be positive", v),
            DistortionError::NonPositiveAspectRatio(v) => {
                write!(f, "Aspect ratio {} must be positive", v)
            }
            DistortionError::FieldOfViewOutOfRange(v) => {
                write!(f, "Horizontal FOV {}° is outside (0°, 180°)", v)
            }
        }
    }
}

impl std::error::Error for DistortionError {}

/// Parameters of the lens-distortion transform
///
/// - `strength`: 0 = rectilinear passthrough, 1 = stereographic-like bending
/// - `height`: tan(vertical FOV / 2), derived by the caller from the horizontal FOV
/// - `aspect_ratio`: screen width / screen height
/// - `cylindrical_ratio`: 0 = cylindrical (one axis), 1 = spherical.
///   Values outside [0, 1] extrapolate and are accepted as long as they are finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistortionParameters {
    strength: f32,
    height: f32,
    aspect_ratio: f32,
    cylindrical_ratio: f32,
}

impl DistortionParameters {
    /// Validate and build a parameter set
    pub fn new(
        strength: f32,
        height: f32,
        aspect_ratio: f32,
        cylindrical_ratio: f32,
    ) -> Result<Self, DistortionError> {
        for (name, value) in [
            ("strength", strength),
            ("height", height),
            ("aspect_ratio", aspect_ratio),
            ("cylindrical_ratio", cylindrical_ratio),
        ] {
            if !value.is_finite() {
                return Err(DistortionError::NonFinite(name));
            }
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(DistortionError::StrengthOutOfRange(strength));
        }
        if height <= 0.0 {
            return Err(DistortionError::NonPositiveHeight(height));
        }
        if aspect_ratio <= 0.0 {
            return Err(DistortionError::NonPositiveAspectRatio(aspect_ratio));
        }

        Ok(Self {
            strength,
            height,
            aspect_ratio,
            cylindrical_ratio,
        })
    }

    /// Build parameters from a horizontal field of view in degrees
    ///
    /// `height = tan(radians(horizontal_fov) / 2) / aspect_ratio`
    pub fn from_horizontal_fov(
        horizontal_fov_degrees: f32,
        aspect_ratio: f32,
        strength: f32,
        cylindrical_ratio: f32,
    ) -> Result<Self, DistortionError> {
        if !horizontal_fov_degrees.is_finite() {
            return Err(DistortionError::NonFinite("horizontal_fov"));
        }
        if horizontal_fov_degrees <= 0.0 || horizontal_fov_degrees >= 180.0 {
            return Err(DistortionError::FieldOfViewOutOfRange(horizontal_fov_degrees));
        }
        if !aspect_ratio.is_finite() {
            return Err(DistortionError::NonFinite("aspect_ratio"));
        }
        if aspect_ratio <= 0.0 {
            return Err(DistortionError::NonPositiveAspectRatio(aspect_ratio));
        }

        let height = (horizontal_fov_degrees.to_radians() / 2.0).tan() / aspect_ratio;
        Self::new(strength, height, aspect_ratio, cylindrical_ratio)
    }

    /// Parameters that leave the image untouched
    pub fn identity(aspect_ratio: f32) -> Result<Self, DistortionError> {
        Self::new(0.0, 1.0, aspect_ratio, 1.0)
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn cylindrical_ratio(&self) -> f32 {
        self.cylindrical_ratio
    }

    /// Vertical field of view (degrees) the scene camera should render with
    ///
    /// The rectilinear render must cover exactly the frustum described by
    /// `height`, so the camera FOV is `2 * atan(height)`.
    pub fn vertical_fov_degrees(&self) -> f32 {
        (self.height.atan() * 2.0).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_parameters() {
        let params = DistortionParameters::new(0.5, 1.2, 1.777, 1.0).unwrap();
        assert_eq!(params.strength(), 0.5);
        assert_eq!(params.height(), 1.2);
        assert_eq!(params.aspect_ratio(), 1.777);
        assert_eq!(params.cylindrical_ratio(), 1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            DistortionParameters::new(f32::NAN, 1.0, 1.0, 1.0),
            Err(DistortionError::NonFinite("strength"))
        );
        assert_eq!(
            DistortionParameters::new(0.5, 1.0, 1.0, f32::INFINITY),
            Err(DistortionError::NonFinite("cylindrical_ratio"))
        );
        assert_eq!(
            DistortionParameters::new(1.5, 1.0, 1.0, 1.0),
            Err(DistortionError::StrengthOutOfRange(1.5))
        );
        assert_eq!(
            DistortionParameters::new(0.5, 0.0, 1.0, 1.0),
            Err(DistortionError::NonPositiveHeight(0.0))
        );
        assert_eq!(
            DistortionParameters::new(0.5, 1.0, 0.0, 1.0),
            Err(DistortionError::NonPositiveAspectRatio(0.0))
        );
    }

    #[test]
    fn test_cylindrical_ratio_may_extrapolate() {
        assert!(DistortionParameters::new(0.5, 1.0, 1.0, 2.5).is_ok());
        assert!(DistortionParameters::new(0.5, 1.0, 1.0, -0.5).is_ok());
    }

    #[test]
    fn test_from_horizontal_fov() {
        // 90° horizontal on a square screen -> tan(45°) = 1
        let params = DistortionParameters::from_horizontal_fov(90.0, 1.0, 1.0, 1.0).unwrap();
        assert!((params.height() - 1.0).abs() < 1e-6);
        assert!((params.vertical_fov_degrees() - 90.0).abs() < 1e-4);

        // 140° on 16:9, the original demo dial
        let params = DistortionParameters::from_horizontal_fov(140.0, 16.0 / 9.0, 1.0, 0.25).unwrap();
        let expected = (70.0f32.to_radians()).tan() / (16.0 / 9.0);
        assert!((params.height() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_fov_range() {
        assert_eq!(
            DistortionParameters::from_horizontal_fov(180.0, 1.0, 1.0, 1.0),
            Err(DistortionError::FieldOfViewOutOfRange(180.0))
        );
        assert_eq!(
            DistortionParameters::from_horizontal_fov(0.0, 1.0, 1.0, 1.0),
            Err(DistortionError::FieldOfViewOutOfRange(0.0))
        );
    }

    #[test]
    fn test_identity() {
        let params = DistortionParameters::identity(1.5).unwrap();
        assert_eq!(params.strength(), 0.0);
        assert_eq!(params.aspect_ratio(), 1.5);
    }
}

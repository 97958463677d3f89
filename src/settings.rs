//! Settings management for the lens effect
//!
//! Handles loading/saving of `.lens` XML files. Per-user defaults are read
//! from `LensDistortion/settings.lens` in the platform config directory.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec4;

use crate::camera::LensDial;
use crate::sampling::{AddressMode, FilterMode, Sampler};

/// RGBA border color (0.0-1.0 per channel)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Default for BorderColor {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

impl From<BorderColor> for Vec4 {
    fn from(c: BorderColor) -> Self {
        Vec4::new(c.r, c.g, c.b, c.a)
    }
}

/// Lens effect settings stored in `.lens` files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "LensSettings")]
pub struct LensSettings {
    /// Horizontal field of view of the distorted output (degrees, 1-179)
    #[serde(rename = "horizontalFov", default = "default_horizontal_fov")]
    pub horizontal_fov_degrees: f32,

    /// Distortion strength (0 = rectilinear, 1 = stereographic)
    #[serde(rename = "strength", default = "default_strength")]
    pub strength: f32,

    /// Cylindrical ratio (0 = cylindrical, 1 = spherical)
    #[serde(rename = "cylindricalRatio", default = "default_cylindrical_ratio")]
    pub cylindrical_ratio: f32,

    /// Boundary policy when the distorted coordinate leaves the source
    #[serde(rename = "addressMode", default)]
    pub address_mode: AddressMode,

    /// Texture filter
    #[serde(rename = "filter", default)]
    pub filter: FilterMode,

    /// Color used by `AddressMode::ClampToBorder`
    #[serde(rename = "borderColor", default)]
    pub border_color: BorderColor,
}

fn default_horizontal_fov() -> f32 {
    140.0
}

fn default_strength() -> f32 {
    1.0
}

fn default_cylindrical_ratio() -> f32 {
    0.25
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            horizontal_fov_degrees: default_horizontal_fov(),
            strength: default_strength(),
            cylindrical_ratio: default_cylindrical_ratio(),
            address_mode: AddressMode::default(),
            filter: FilterMode::default(),
            border_color: BorderColor::default(),
        }
    }
}

impl LensSettings {
    /// Clamp values into usable ranges
    ///
    /// The cylindrical ratio is left alone: values outside [0, 1] extrapolate.
    pub fn clamp(&mut self) {
        self.horizontal_fov_degrees = self.horizontal_fov_degrees.clamp(1.0, 179.0);
        self.strength = self.strength.clamp(0.0, 1.0);
        let c = &mut self.border_color;
        c.r = c.r.clamp(0.0, 1.0);
        c.g = c.g.clamp(0.0, 1.0);
        c.b = c.b.clamp(0.0, 1.0);
        c.a = c.a.clamp(0.0, 1.0);
    }

    /// The lens dial portion of the settings
    pub fn dial(&self) -> LensDial {
        LensDial {
            horizontal_fov_degrees: self.horizontal_fov_degrees,
            strength: self.strength,
            cylindrical_ratio: self.cylindrical_ratio,
        }
    }

    /// The sampler portion of the settings
    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.address_mode, self.filter, self.border_color.into())
    }

    /// Load settings from a `.lens` XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        settings.clamp();
        Ok(settings)
    }

    /// Save settings to a `.lens` XML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);
        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Path of the per-user default settings file
    fn get_default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("LensDistortion");
            p.push("settings.lens");
            p
        })
    }

    /// Load the per-user default settings, falling back to built-in defaults
    pub fn load() -> Self {
        let Some(path) = Self::get_default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}

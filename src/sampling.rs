//! CPU texture sampling
//!
//! Mirrors what a GPU sampler does with an `Rgba8Unorm` texture: texel
//! centers sit at `(i + 0.5) / size`, linear filtering blends the four
//! nearest texels, and the address mode decides what lies outside [0, 1].

use std::ops::Deref;

use glam::{Vec2, Vec4};
use image::{ImageBuffer, Rgba};
use serde::{Deserialize, Serialize};

use crate::distortion::ProjectiveSample;

/// Boundary policy for coordinates outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AddressMode {
    /// Repeat the edge texel
    #[default]
    ClampToEdge,
    /// Tile the image
    Repeat,
    /// Tile the image, flipping every other copy
    MirrorRepeat,
    /// Return the border color
    ClampToBorder,
}

impl AddressMode {
    pub const ALL: [AddressMode; 4] = [
        AddressMode::ClampToEdge,
        AddressMode::Repeat,
        AddressMode::MirrorRepeat,
        AddressMode::ClampToBorder,
    ];

    /// Name used on the command line and in effect parameters
    pub fn name(&self) -> &'static str {
        match self {
            AddressMode::ClampToEdge => "clamp",
            AddressMode::Repeat => "repeat",
            AddressMode::MirrorRepeat => "mirror",
            AddressMode::ClampToBorder => "border",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|mode| mode == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    /// Resolve an integer texel index, `None` meaning "use the border color"
    fn texel(&self, index: i64, size: u32) -> Option<u32> {
        let size = i64::from(size);
        let resolved = match self {
            AddressMode::ClampToEdge => index.clamp(0, size - 1),
            AddressMode::Repeat => index.rem_euclid(size),
            AddressMode::MirrorRepeat => {
                let period = index.rem_euclid(2 * size);
                if period >= size {
                    2 * size - 1 - period
                } else {
                    period
                }
            }
            AddressMode::ClampToBorder => {
                if index < 0 || index >= size {
                    return None;
                }
                index
            }
        };
        Some(resolved as u32)
    }

    /// Equivalent wgpu address mode
    ///
    /// Border handling happens in the shader so the sampler never needs the
    /// optional clamp-to-border device feature.
    pub fn to_wgpu(&self) -> wgpu::AddressMode {
        match self {
            AddressMode::ClampToEdge | AddressMode::ClampToBorder => wgpu::AddressMode::ClampToEdge,
            AddressMode::Repeat => wgpu::AddressMode::Repeat,
            AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// Texture filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

impl FilterMode {
    pub const ALL: [FilterMode; 2] = [FilterMode::Nearest, FilterMode::Linear];

    pub fn name(&self) -> &'static str {
        match self {
            FilterMode::Nearest => "nearest",
            FilterMode::Linear => "linear",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name() == name)
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|mode| mode == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL.get(index).copied().unwrap_or_default()
    }

    pub fn to_wgpu(&self) -> wgpu::FilterMode {
        match self {
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
            FilterMode::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Sampler state: filter, address mode and border color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    pub address_mode: AddressMode,
    pub filter: FilterMode,
    /// RGBA in 0.0-1.0, used by `AddressMode::ClampToBorder`
    pub border_color: Vec4,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            address_mode: AddressMode::ClampToEdge,
            filter: FilterMode::Linear,
            border_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl Sampler {
    pub fn new(address_mode: AddressMode, filter: FilterMode, border_color: Vec4) -> Self {
        Self {
            address_mode,
            filter,
            border_color,
        }
    }

    /// Sample an RGBA8 image at a normalized coordinate, returning 0.0-1.0 RGBA
    pub fn sample<C>(&self, image: &ImageBuffer<Rgba<u8>, C>, uv: Vec2) -> Vec4
    where
        C: Deref<Target = [u8]>,
    {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return self.border_color;
        }

        match self.filter {
            // The texel whose footprint contains the coordinate
            FilterMode::Nearest => self.fetch(
                image,
                (uv.x * width as f32).floor() as i64,
                (uv.y * height as f32).floor() as i64,
            ),
            FilterMode::Linear => {
                // Texel space with texel centers on integers
                let x = uv.x * width as f32 - 0.5;
                let y = uv.y * height as f32 - 0.5;
                let x0 = x.floor();
                let y0 = y.floor();
                let fx = x - x0;
                let fy = y - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);

                let p00 = self.fetch(image, x0, y0);
                let p10 = self.fetch(image, x0 + 1, y0);
                let p01 = self.fetch(image, x0, y0 + 1);
                let p11 = self.fetch(image, x0 + 1, y0 + 1);

                p00 * ((1.0 - fx) * (1.0 - fy))
                    + p10 * (fx * (1.0 - fy))
                    + p01 * ((1.0 - fx) * fy)
                    + p11 * (fx * fy)
            }
        }
    }

    /// Perspective-divide a projective sample, then sample
    pub fn sample_projective<C>(&self, image: &ImageBuffer<Rgba<u8>, C>, sample: ProjectiveSample) -> Vec4
    where
        C: Deref<Target = [u8]>,
    {
        self.sample(image, sample.resolve())
    }

    fn fetch<C>(&self, image: &ImageBuffer<Rgba<u8>, C>, x: i64, y: i64) -> Vec4
    where
        C: Deref<Target = [u8]>,
    {
        let (width, height) = image.dimensions();
        match (
            self.address_mode.texel(x, width),
            self.address_mode.texel(y, height),
        ) {
            (Some(tx), Some(ty)) => {
                let p = image.get_pixel(tx, ty).0;
                Vec4::new(p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32) / 255.0
            }
            _ => self.border_color,
        }
    }
}

/// Convert a 0.0-1.0 RGBA color to RGBA8
pub fn to_rgba8(color: Vec4) -> [u8; 4] {
    let c = (color.clamp(Vec4::ZERO, Vec4::ONE) * 255.0).round();
    [c.x as u8, c.y as u8, c.z as u8, c.w as u8]
}

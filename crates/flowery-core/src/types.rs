// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Flowery: anchors, color modes, formats, resampling
// filters, flip axes and canvas sizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FloweryError;

/// Horizontal component of an [`Anchor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    Left,
    Middle,
    Right,
}

/// Vertical component of an [`Anchor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

/// Symbolic reference point used when compositing one image onto another.
///
/// The two-letter code reads horizontal first (`l`/`m`/`r`), then vertical
/// (`t`/`m`/`b`), so `"rb"` is the bottom-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Anchor {
    #[default]
    LeftTop,
    LeftMiddle,
    LeftBottom,
    MiddleTop,
    MiddleMiddle,
    MiddleBottom,
    RightTop,
    RightMiddle,
    RightBottom,
}

impl Anchor {
    /// All nine anchors, in code order.
    pub const ALL: [Anchor; 9] = [
        Self::LeftTop,
        Self::LeftMiddle,
        Self::LeftBottom,
        Self::MiddleTop,
        Self::MiddleMiddle,
        Self::MiddleBottom,
        Self::RightTop,
        Self::RightMiddle,
        Self::RightBottom,
    ];

    pub fn horizontal(&self) -> HorizontalAlign {
        match self {
            Self::LeftTop | Self::LeftMiddle | Self::LeftBottom => HorizontalAlign::Left,
            Self::MiddleTop | Self::MiddleMiddle | Self::MiddleBottom => HorizontalAlign::Middle,
            Self::RightTop | Self::RightMiddle | Self::RightBottom => HorizontalAlign::Right,
        }
    }

    pub fn vertical(&self) -> VerticalAlign {
        match self {
            Self::LeftTop | Self::MiddleTop | Self::RightTop => VerticalAlign::Top,
            Self::LeftMiddle | Self::MiddleMiddle | Self::RightMiddle => VerticalAlign::Middle,
            Self::LeftBottom | Self::MiddleBottom | Self::RightBottom => VerticalAlign::Bottom,
        }
    }

    /// The two-letter anchor code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::LeftTop => "lt",
            Self::LeftMiddle => "lm",
            Self::LeftBottom => "lb",
            Self::MiddleTop => "mt",
            Self::MiddleMiddle => "mm",
            Self::MiddleBottom => "mb",
            Self::RightTop => "rt",
            Self::RightMiddle => "rm",
            Self::RightBottom => "rb",
        }
    }
}

impl FromStr for Anchor {
    type Err = FloweryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|anchor| anchor.code() == s)
            .ok_or_else(|| FloweryError::InvalidAnchor(s.to_string()))
    }
}

impl TryFrom<String> for Anchor {
    type Error = FloweryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Anchor> for String {
    fn from(anchor: Anchor) -> Self {
        anchor.code().to_string()
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pixel layout of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// 8-bit grayscale.
    L,
    /// 8-bit grayscale with alpha.
    La,
    /// 8-bit palette indices into a color table of at most 256 entries.
    P,
    Rgb,
    Rgba,
    L16,
    La16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
}

impl Mode {
    pub const ALL: [Mode; 11] = [
        Self::L,
        Self::La,
        Self::P,
        Self::Rgb,
        Self::Rgba,
        Self::L16,
        Self::La16,
        Self::Rgb16,
        Self::Rgba16,
        Self::Rgb32F,
        Self::Rgba32F,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::L => "L",
            Self::La => "LA",
            Self::P => "P",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
            Self::L16 => "L16",
            Self::La16 => "LA16",
            Self::Rgb16 => "RGB16",
            Self::Rgba16 => "RGBA16",
            Self::Rgb32F => "RGB32F",
            Self::Rgba32F => "RGBA32F",
        }
    }

    /// Number of bands stored per pixel (palette images store one index).
    pub fn channel_count(&self) -> u8 {
        match self {
            Self::L | Self::P | Self::L16 => 1,
            Self::La | Self::La16 => 2,
            Self::Rgb | Self::Rgb16 | Self::Rgb32F => 3,
            Self::Rgba | Self::Rgba16 | Self::Rgba32F => 4,
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            Self::La | Self::Rgba | Self::La16 | Self::Rgba16 | Self::Rgba32F
        )
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(self, Self::L | Self::La | Self::L16 | Self::La16)
    }

    /// Value of a fully saturated channel (and of full opacity).
    pub fn max_value(&self) -> f32 {
        match self {
            Self::L | Self::La | Self::P | Self::Rgb | Self::Rgba => 255.0,
            Self::L16 | Self::La16 | Self::Rgb16 | Self::Rgba16 => 65535.0,
            Self::Rgb32F | Self::Rgba32F => 1.0,
        }
    }

    /// The same layout with its alpha band removed. Palette images become RGB.
    pub fn without_alpha(&self) -> Mode {
        match self {
            Self::La => Self::L,
            Self::Rgba | Self::P => Self::Rgb,
            Self::La16 => Self::L16,
            Self::Rgba16 => Self::Rgb16,
            Self::Rgba32F => Self::Rgb32F,
            other => *other,
        }
    }

    /// The same layout with an alpha band added. Palette images become RGBA.
    pub fn with_alpha(&self) -> Mode {
        match self {
            Self::L => Self::La,
            Self::Rgb | Self::P => Self::Rgba,
            Self::L16 => Self::La16,
            Self::Rgb16 => Self::Rgba16,
            Self::Rgb32F => Self::Rgba32F,
            other => *other,
        }
    }
}

impl FromStr for Mode {
    type Err = FloweryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FloweryError::InvalidMode(s.to_string()))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Encoded container formats Flowery can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Bmp,
    Tiff,
    #[serde(rename = "webp")]
    WebP,
    Gif,
}

impl Format {
    /// Canonical lowercase name, as used in data URLs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Tiff => "image/tiff",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" | "jpe" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }
}

impl FromStr for Format {
    type Err = FloweryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| FloweryError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resampling filter used by rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resample {
    Nearest,
    Bilinear,
    #[default]
    Bicubic,
}

/// Axis for flip operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipAxis {
    /// Mirror across the horizontal axis (top becomes bottom).
    X,
    /// Mirror across the vertical axis (left becomes right).
    Y,
    /// Both axes, i.e. a 180 degree rotation.
    XY,
}

impl FromStr for FlipAxis {
    type Err = FloweryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "xy" => Ok(Self::XY),
            other => Err(FloweryError::InvalidAxis(other.to_string())),
        }
    }
}

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square of side `side`.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<u32> for Size {
    fn from(side: u32) -> Self {
        Self::square(side)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

/// Opacity requested for a whole image: a fraction in `0.0..=1.0` or an
/// 8-bit level in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Alpha {
    Fraction(f64),
    Level(i64),
}

impl Alpha {
    /// Validate and convert to an 8-bit alpha level. Fractions are scaled by
    /// 255 and truncated.
    pub fn level(&self) -> Result<u8, FloweryError> {
        match *self {
            Self::Fraction(value) => {
                if !(0.0..=1.0).contains(&value) {
                    return Err(FloweryError::InvalidOpacity(format!(
                        "fraction must be between 0 and 1, got {value}"
                    )));
                }
                Ok((value * 255.0) as u8)
            }
            Self::Level(value) => u8::try_from(value).map_err(|_| {
                FloweryError::InvalidOpacity(format!("level must be between 0 and 255, got {value}"))
            }),
        }
    }
}

impl From<f64> for Alpha {
    fn from(value: f64) -> Self {
        Self::Fraction(value)
    }
}

impl From<f32> for Alpha {
    fn from(value: f32) -> Self {
        Self::Fraction(value.into())
    }
}

impl From<i64> for Alpha {
    fn from(value: i64) -> Self {
        Self::Level(value)
    }
}

impl From<i32> for Alpha {
    fn from(value: i32) -> Self {
        Self::Level(value.into())
    }
}

impl From<u8> for Alpha {
    fn from(value: u8) -> Self {
        Self::Level(value.into())
    }
}

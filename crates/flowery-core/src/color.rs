// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fill colors. A color is a CSS-style string, a single intensity, or a tuple
// of channel values; it is only given a concrete meaning once the target
// image mode is known.

use serde::{Deserialize, Serialize};

use crate::error::{FloweryError, Result};
use crate::types::Mode;

/// A fill color, interpreted according to the mode of the image it is used on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    /// CSS-style color: a name (`"red"`), hex (`"#f80"`, `"#ff8800cc"`) or
    /// functional notation (`"rgb(255, 136, 0)"`, `"rgba(255, 136, 0, 128)"`).
    Named(String),
    /// A single channel value in the mode's scale. For palette images this is
    /// the palette index.
    Intensity(f64),
    /// One value per band in the mode's scale: 1-2 values for grayscale
    /// modes, 3-4 values for color modes.
    Channels(Vec<f64>),
}

/// Basic CSS named colors as RGB triples.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
    ("gold", [255, 215, 0]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("beige", [245, 245, 220]),
    ("coral", [255, 127, 80]),
    ("crimson", [220, 20, 60]),
    ("darkgray", [169, 169, 169]),
    ("darkgrey", [169, 169, 169]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("skyblue", [135, 206, 235]),
    ("salmon", [250, 128, 114]),
    ("tomato", [255, 99, 71]),
    ("turquoise", [64, 224, 208]),
];

impl Color {
    /// Parse a CSS-style color string into 8-bit RGBA.
    pub fn parse_rgba8(input: &str) -> Result<[u8; 4]> {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        if normalized == "transparent" {
            return Ok([0, 0, 0, 0]);
        }
        if let Some(hex) = normalized.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| FloweryError::InvalidColor(input.to_string()));
        }
        if let Some(body) = normalized
            .strip_prefix("rgba(")
            .or_else(|| normalized.strip_prefix("rgb("))
        {
            return parse_functional(body).ok_or_else(|| FloweryError::InvalidColor(input.to_string()));
        }

        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, [r, g, b])| [*r, *g, *b, 255])
            .ok_or_else(|| FloweryError::InvalidColor(input.to_string()))
    }

    /// Resolve the color to normalized RGBA (each component in `0.0..=1.0`)
    /// for an image of the given mode.
    pub fn resolve(&self, mode: Mode) -> Result<[f32; 4]> {
        let max = mode.max_value();
        let scale = |value: f64| -> Result<f32> {
            let value = value as f32;
            if !value.is_finite() || value < 0.0 || value > max {
                return Err(FloweryError::InvalidColor(format!(
                    "channel value {value} outside 0..={max} for mode {mode}"
                )));
            }
            Ok(value / max)
        };

        match self {
            Self::Named(input) => {
                let rgba = Self::parse_rgba8(input)?;
                Ok(rgba.map(|c| c as f32 / 255.0))
            }
            Self::Intensity(value) => {
                let v = scale(*value)?;
                Ok([v, v, v, 1.0])
            }
            Self::Channels(values) => match (mode.is_grayscale(), values.as_slice()) {
                (true, [v]) => {
                    let v = scale(*v)?;
                    Ok([v, v, v, 1.0])
                }
                (true, [v, a]) => {
                    let v = scale(*v)?;
                    Ok([v, v, v, scale(*a)?])
                }
                (false, [r, g, b]) => Ok([scale(*r)?, scale(*g)?, scale(*b)?, 1.0]),
                (false, [r, g, b, a]) => Ok([scale(*r)?, scale(*g)?, scale(*b)?, scale(*a)?]),
                _ => Err(FloweryError::InvalidColor(format!(
                    "{} channel values do not fit mode {mode}",
                    values.len()
                ))),
            },
        }
    }
}

/// ITU-R 601-2 luma of a normalized RGB triple.
pub fn luma(rgb: [f32; 3]) -> f32 {
    rgb[0] * 0.299 + rgb[1] * 0.587 + rgb[2] * 0.114
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
        4 => Some([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<[u8; 4]> {
    let inner = body.strip_suffix(')')?;
    let parts = inner
        .split(',')
        .map(|part| part.parse::<u8>().ok())
        .collect::<Option<Vec<u8>>>()?;
    match parts.as_slice() {
        [r, g, b] => Some([*r, *g, *b, 255]),
        [r, g, b, a] => Some([*r, *g, *b, *a]),
        _ => None,
    }
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Self::Named(value.to_string())
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self::Named(value)
    }
}

impl From<f64> for Color {
    fn from(value: f64) -> Self {
        Self::Intensity(value)
    }
}

impl From<u8> for Color {
    fn from(value: u8) -> Self {
        Self::Intensity(value.into())
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::Channels(vec![r.into(), g.into(), b.into()])
    }
}

impl From<(u8, u8, u8, u8)> for Color {
    fn from((r, g, b, a): (u8, u8, u8, u8)) -> Self {
        Self::Channels(vec![r.into(), g.into(), b.into(), a.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_forms() {
        assert_eq!(Color::parse_rgba8("#f80").unwrap(), [255, 136, 0, 255]);
        assert_eq!(Color::parse_rgba8("#FF880080").unwrap(), [255, 136, 0, 128]);
        assert_eq!(Color::parse_rgba8("#00000000").unwrap(), [0, 0, 0, 0]);
        assert!(Color::parse_rgba8("#12345").is_err());
        assert!(Color::parse_rgba8("#zzz").is_err());
    }

    #[test]
    fn parses_names_and_functions() {
        assert_eq!(Color::parse_rgba8("Red").unwrap(), [255, 0, 0, 255]);
        assert_eq!(Color::parse_rgba8("rgb(1, 2, 3)").unwrap(), [1, 2, 3, 255]);
        assert_eq!(Color::parse_rgba8("rgba(1,2,3,4)").unwrap(), [1, 2, 3, 4]);
        assert_eq!(Color::parse_rgba8("transparent").unwrap(), [0, 0, 0, 0]);
        assert!(Color::parse_rgba8("no-such-color").is_err());
        assert!(Color::parse_rgba8("rgb(1,2)").is_err());
    }

    #[test]
    fn intensity_uses_mode_scale() {
        let rgb = Color::Intensity(255.0).resolve(Mode::L).unwrap();
        assert_eq!(rgb, [1.0, 1.0, 1.0, 1.0]);
        let deep = Color::Intensity(65535.0).resolve(Mode::L16).unwrap();
        assert_eq!(deep, [1.0, 1.0, 1.0, 1.0]);
        assert!(Color::Intensity(256.0).resolve(Mode::L).is_err());
        assert!(Color::Intensity(-1.0).resolve(Mode::Rgb).is_err());
    }

    #[test]
    fn channel_count_must_fit_mode() {
        assert!(Color::from((1, 2, 3)).resolve(Mode::Rgb).is_ok());
        assert!(Color::from((1, 2, 3)).resolve(Mode::L).is_err());
        assert!(Color::Channels(vec![10.0, 20.0]).resolve(Mode::La).is_ok());
        assert!(Color::Channels(vec![10.0, 20.0]).resolve(Mode::Rgba).is_err());
        let rgba = Color::from((0, 0, 0, 0)).resolve(Mode::Rgba).unwrap();
        assert_eq!(rgba[3], 0.0);
    }

    #[test]
    fn luma_of_white_is_one() {
        assert!((luma([1.0, 1.0, 1.0]) - 1.0).abs() < 1e-6);
    }
}

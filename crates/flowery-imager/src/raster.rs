// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster storage — the image handle owned by an `Imager`. Direct images are
// `image::DynamicImage` values; palette images are kept as an index plane plus
// a color table, since the `image` crate expands palettes on decode.

use std::borrow::Cow;
use std::collections::HashMap;

use flowery_core::color::luma;
use flowery_core::error::{FloweryError, Result};
use flowery_core::{Color, Mode, Size};
use image::{
    ColorType, DynamicImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage,
};
use tracing::{debug, warn};

/// Maximum number of entries in a palette.
pub const PALETTE_SIZE: usize = 256;

/// Side length of the fallback web palette's color cube (6 * 6 * 6 = 216).
const WEB_LEVELS: u16 = 6;

/// A pixel buffer in one of the supported modes.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Direct(DynamicImage),
    Indexed(IndexedImage),
}

/// Palette image: one `u8` index per pixel into a table of RGB entries, with
/// an optional index that is rendered fully transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedImage {
    indices: GrayImage,
    palette: Vec<[u8; 3]>,
    transparent: Option<u8>,
}

impl IndexedImage {
    /// Build a palette image from an index plane and color table.
    pub fn new(indices: GrayImage, palette: Vec<[u8; 3]>, transparent: Option<u8>) -> Result<Self> {
        if palette.is_empty() || palette.len() > PALETTE_SIZE {
            return Err(FloweryError::InvalidColor(format!(
                "palette must hold 1..={PALETTE_SIZE} entries, got {}",
                palette.len()
            )));
        }
        if indices.width() == 0 || indices.height() == 0 {
            return Err(FloweryError::InvalidSize(format!(
                "{}x{}",
                indices.width(),
                indices.height()
            )));
        }
        Ok(Self {
            indices,
            palette,
            transparent,
        })
    }

    /// A canvas filled with a single palette entry.
    ///
    /// Without a color, or with an intensity, the palette is a 256-step gray
    /// ramp and the intensity selects the index. Any other color becomes the
    /// sole palette entry (transparent when its alpha is zero).
    pub fn filled(size: Size, color: Option<&Color>) -> Result<Self> {
        let (palette, index, transparent) = match (color, palette_index(color)?) {
            (None, _) => (gray_ramp(), 0, None),
            (_, Some(index)) => (gray_ramp(), index, None),
            (Some(other), None) => {
                let [r, g, b, a] = other.resolve(Mode::P)?;
                let transparent = (a == 0.0).then_some(0);
                (vec![[q8(r), q8(g), q8(b)]], 0, transparent)
            }
        };
        Self::new(
            GrayImage::from_pixel(size.width, size.height, Luma([index])),
            palette,
            transparent,
        )
    }

    /// Quantize an RGBA image to at most 256 colors.
    ///
    /// Images with few enough distinct colors get an exact palette. Larger
    /// images are mapped onto the 216-color web palette. Fully transparent
    /// pixels share a single transparent index in both cases.
    pub fn quantize(rgba: &RgbaImage) -> Self {
        let has_clear = rgba.pixels().any(|p| p[3] == 0);
        let reserved = usize::from(has_clear);

        let mut lookup: HashMap<[u8; 3], u8> = HashMap::new();
        let mut exact = true;
        for pixel in rgba.pixels().filter(|p| p[3] != 0) {
            let key = [pixel[0], pixel[1], pixel[2]];
            if lookup.contains_key(&key) {
                continue;
            }
            if lookup.len() + reserved >= PALETTE_SIZE {
                exact = false;
                break;
            }
            let index = (lookup.len() + reserved) as u8;
            lookup.insert(key, index);
        }

        let (palette, transparent) = if exact {
            let mut palette = vec![[0u8; 3]; (lookup.len() + reserved).max(1)];
            for (color, index) in &lookup {
                palette[usize::from(*index)] = *color;
            }
            (palette, has_clear.then_some(0))
        } else {
            warn!("More than {PALETTE_SIZE} colors, falling back to the web palette");
            let mut palette = web_palette();
            let transparent = has_clear.then(|| {
                palette.push([0, 0, 0]);
                (palette.len() - 1) as u8
            });
            (palette, transparent)
        };

        let indices = GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let pixel = rgba.get_pixel(x, y);
            if let (0, Some(clear)) = (pixel[3], transparent) {
                return Luma([clear]);
            }
            let key = [pixel[0], pixel[1], pixel[2]];
            let index = if exact {
                lookup.get(&key).copied().unwrap_or(0)
            } else {
                web_index(key)
            };
            Luma([index])
        });

        debug!(
            colors = palette.len(),
            exact,
            transparent = ?transparent,
            "Quantized to palette"
        );
        Self {
            indices,
            palette,
            transparent,
        }
    }

    pub fn width(&self) -> u32 {
        self.indices.width()
    }

    pub fn height(&self) -> u32 {
        self.indices.height()
    }

    /// The index plane.
    pub fn indices(&self) -> &GrayImage {
        &self.indices
    }

    pub fn palette(&self) -> &[[u8; 3]] {
        &self.palette
    }

    /// Palette index rendered as fully transparent, if any.
    pub fn transparent(&self) -> Option<u8> {
        self.transparent
    }

    pub fn set_transparent(&mut self, index: Option<u8>) {
        self.transparent = index;
    }

    /// Palette color of `index`. Indices beyond the table render black.
    pub fn color_of(&self, index: u8) -> [u8; 3] {
        self.palette
            .get(usize::from(index))
            .copied()
            .unwrap_or([0, 0, 0])
    }

    /// Same palette, different index plane.
    pub fn with_indices(&self, indices: GrayImage) -> Self {
        Self {
            indices,
            palette: self.palette.clone(),
            transparent: self.transparent,
        }
    }

    /// Same index plane, every palette entry inverted.
    pub fn inverted(&self) -> Self {
        Self {
            indices: self.indices.clone(),
            palette: self
                .palette
                .iter()
                .map(|rgb| rgb.map(|c| u8::MAX - c))
                .collect(),
            transparent: self.transparent,
        }
    }

    /// Index of the closest opaque palette entry (squared RGB distance).
    pub fn nearest_index(&self, rgb: [u8; 3]) -> u8 {
        self.palette
            .iter()
            .enumerate()
            .filter(|(index, _)| Some(*index as u8) != self.transparent)
            .min_by_key(|(_, entry)| {
                entry
                    .iter()
                    .zip(rgb.iter())
                    .map(|(a, b)| (i32::from(*a) - i32::from(*b)).pow(2))
                    .sum::<i32>()
            })
            .map(|(index, _)| index as u8)
            .unwrap_or(0)
    }

    /// Palette index to use for a fill color.
    ///
    /// No color selects the transparent index (or 0). An intensity is taken
    /// as an index verbatim. Other colors pick the nearest entry, or the
    /// transparent index when their alpha is zero.
    pub fn index_for(&self, color: Option<&Color>) -> Result<u8> {
        if let Some(index) = palette_index(color)? {
            return Ok(index);
        }
        match color {
            None => Ok(self.transparent.unwrap_or(0)),
            Some(other) => {
                let [r, g, b, a] = other.resolve(Mode::P)?;
                match self.transparent {
                    Some(clear) if a == 0.0 => Ok(clear),
                    _ => Ok(self.nearest_index([q8(r), q8(g), q8(b)])),
                }
            }
        }
    }

    /// Map an RGBA image onto this palette, producing an index plane.
    pub fn remap(&self, rgba: &RgbaImage) -> GrayImage {
        let mut cache: HashMap<[u8; 3], u8> = HashMap::new();
        GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| {
            let pixel = rgba.get_pixel(x, y);
            if let (0, Some(clear)) = (pixel[3], self.transparent) {
                return Luma([clear]);
            }
            let key = [pixel[0], pixel[1], pixel[2]];
            let index = *cache
                .entry(key)
                .or_insert_with(|| self.nearest_index(key));
            Luma([index])
        })
    }

    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            Rgb(self.color_of(self.indices.get_pixel(x, y)[0]))
        })
    }

    /// Expand to RGBA; the transparent index gets alpha 0.
    pub fn to_rgba8(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            let index = self.indices.get_pixel(x, y)[0];
            let [r, g, b] = self.color_of(index);
            let alpha = if Some(index) == self.transparent { 0 } else { u8::MAX };
            Rgba([r, g, b, alpha])
        })
    }

    /// Expand to a direct image: RGBA when a transparent index is set,
    /// otherwise RGB.
    pub fn expand(&self) -> DynamicImage {
        match self.transparent {
            Some(_) => DynamicImage::ImageRgba8(self.to_rgba8()),
            None => DynamicImage::ImageRgb8(self.to_rgb8()),
        }
    }
}

impl Raster {
    /// Wrap a decoded image, normalizing color types Flowery has no mode for
    /// to RGBA.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image.color() {
            ColorType::L8
            | ColorType::La8
            | ColorType::Rgb8
            | ColorType::Rgba8
            | ColorType::L16
            | ColorType::La16
            | ColorType::Rgb16
            | ColorType::Rgba16
            | ColorType::Rgb32F
            | ColorType::Rgba32F => Self::Direct(image),
            _ => Self::Direct(DynamicImage::ImageRgba8(image.to_rgba8())),
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Self::Indexed(_) => Mode::P,
            Self::Direct(image) => match image.color() {
                ColorType::L8 => Mode::L,
                ColorType::La8 => Mode::La,
                ColorType::Rgb8 => Mode::Rgb,
                ColorType::L16 => Mode::L16,
                ColorType::La16 => Mode::La16,
                ColorType::Rgb16 => Mode::Rgb16,
                ColorType::Rgba16 => Mode::Rgba16,
                ColorType::Rgb32F => Mode::Rgb32F,
                ColorType::Rgba32F => Mode::Rgba32F,
                _ => Mode::Rgba,
            },
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Direct(image) => (image.width(), image.height()),
            Self::Indexed(image) => (image.width(), image.height()),
        }
    }

    /// Borrow as a direct image, expanding palettes.
    pub fn to_dynamic(&self) -> Cow<'_, DynamicImage> {
        match self {
            Self::Direct(image) => Cow::Borrowed(image),
            Self::Indexed(image) => Cow::Owned(image.expand()),
        }
    }

    /// Consume into a direct image, expanding palettes.
    pub fn into_dynamic(self) -> DynamicImage {
        match self {
            Self::Direct(image) => image,
            Self::Indexed(image) => image.expand(),
        }
    }

    pub fn to_rgba8(&self) -> RgbaImage {
        match self {
            Self::Direct(image) => image.to_rgba8(),
            Self::Indexed(image) => image.to_rgba8(),
        }
    }

    pub fn to_luma8(&self) -> GrayImage {
        self.to_dynamic().to_luma8()
    }

    /// Raw pixel bytes in native layout (palette indices for `P`).
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Direct(image) => image.as_bytes(),
            Self::Indexed(image) => image.indices().as_raw(),
        }
    }

    /// Convert to another mode. Converting to the current mode is a copy.
    pub fn convert(&self, mode: Mode) -> Raster {
        if self.mode() == mode {
            return self.clone();
        }
        if mode == Mode::P {
            return Self::Indexed(IndexedImage::quantize(&self.to_rgba8()));
        }
        let source = self.to_dynamic();
        let converted = match mode {
            Mode::L => DynamicImage::ImageLuma8(source.to_luma8()),
            Mode::La => DynamicImage::ImageLumaA8(source.to_luma_alpha8()),
            Mode::Rgb | Mode::P => DynamicImage::ImageRgb8(source.to_rgb8()),
            Mode::Rgba => DynamicImage::ImageRgba8(source.to_rgba8()),
            Mode::L16 => DynamicImage::ImageLuma16(source.to_luma16()),
            Mode::La16 => DynamicImage::ImageLumaA16(source.to_luma_alpha16()),
            Mode::Rgb16 => DynamicImage::ImageRgb16(source.to_rgb16()),
            Mode::Rgba16 => DynamicImage::ImageRgba16(source.to_rgba16()),
            Mode::Rgb32F => DynamicImage::ImageRgb32F(source.to_rgb32f()),
            Mode::Rgba32F => DynamicImage::ImageRgba32F(source.to_rgba32f()),
        };
        Self::Direct(converted)
    }
}

/// A resolved fill color (normalized RGBA) that can be rendered as a pixel of
/// any direct mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill(pub [f32; 4]);

impl Fill {
    /// All channels zero: black, and fully transparent in alpha modes.
    pub const ZERO: Fill = Fill([0.0; 4]);

    pub fn resolve(color: Option<&Color>, mode: Mode) -> Result<Self> {
        color
            .map(|c| c.resolve(mode).map(Fill))
            .unwrap_or(Ok(Self::ZERO))
    }

    fn luma(&self) -> f32 {
        let [r, g, b, _] = self.0;
        luma([r, g, b])
    }

    pub fn luma8(&self) -> Luma<u8> {
        Luma([q8(self.luma())])
    }

    pub fn luma_alpha8(&self) -> LumaA<u8> {
        LumaA([q8(self.luma()), q8(self.0[3])])
    }

    pub fn rgb8(&self) -> Rgb<u8> {
        let [r, g, b, _] = self.0;
        Rgb([q8(r), q8(g), q8(b)])
    }

    pub fn rgba8(&self) -> Rgba<u8> {
        Rgba(self.0.map(q8))
    }

    pub fn luma16(&self) -> Luma<u16> {
        Luma([q16(self.luma())])
    }

    pub fn luma_alpha16(&self) -> LumaA<u16> {
        LumaA([q16(self.luma()), q16(self.0[3])])
    }

    pub fn rgb16(&self) -> Rgb<u16> {
        let [r, g, b, _] = self.0;
        Rgb([q16(r), q16(g), q16(b)])
    }

    pub fn rgba16(&self) -> Rgba<u16> {
        Rgba(self.0.map(q16))
    }

    pub fn rgb32f(&self) -> Rgb<f32> {
        let [r, g, b, _] = self.0;
        Rgb([r, g, b])
    }

    pub fn rgba32f(&self) -> Rgba<f32> {
        Rgba(self.0)
    }

    /// A solid canvas of a direct mode. `P` yields RGB; palette canvases are
    /// built by [`IndexedImage::filled`].
    pub fn canvas(&self, mode: Mode, size: Size) -> DynamicImage {
        let (w, h) = (size.width, size.height);
        match mode {
            Mode::L => DynamicImage::ImageLuma8(ImageBuffer::from_pixel(w, h, self.luma8())),
            Mode::La => DynamicImage::ImageLumaA8(ImageBuffer::from_pixel(w, h, self.luma_alpha8())),
            Mode::Rgb | Mode::P => DynamicImage::ImageRgb8(ImageBuffer::from_pixel(w, h, self.rgb8())),
            Mode::Rgba => DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, self.rgba8())),
            Mode::L16 => DynamicImage::ImageLuma16(ImageBuffer::from_pixel(w, h, self.luma16())),
            Mode::La16 => {
                DynamicImage::ImageLumaA16(ImageBuffer::from_pixel(w, h, self.luma_alpha16()))
            }
            Mode::Rgb16 => DynamicImage::ImageRgb16(ImageBuffer::from_pixel(w, h, self.rgb16())),
            Mode::Rgba16 => DynamicImage::ImageRgba16(ImageBuffer::from_pixel(w, h, self.rgba16())),
            Mode::Rgb32F => DynamicImage::ImageRgb32F(ImageBuffer::from_pixel(w, h, self.rgb32f())),
            Mode::Rgba32F => {
                DynamicImage::ImageRgba32F(ImageBuffer::from_pixel(w, h, self.rgba32f()))
            }
        }
    }
}

/// Where the new alpha band comes from in [`put_alpha`].
#[derive(Debug, Clone, Copy)]
pub enum AlphaSource<'a> {
    /// Same 8-bit level everywhere.
    Constant(u8),
    /// Per-pixel 8-bit levels; must match the raster's dimensions.
    Band(&'a GrayImage),
}

impl AlphaSource<'_> {
    fn level(&self, x: u32, y: u32) -> u8 {
        match self {
            Self::Constant(level) => *level,
            Self::Band(band) => band.get_pixel(x, y)[0],
        }
    }
}

/// Replace (or add) the alpha band. Grayscale images become LA, everything
/// else RGBA, keeping 16-bit and float depth.
pub fn put_alpha(raster: &Raster, alpha: AlphaSource<'_>) -> Raster {
    let target = raster.mode().with_alpha();
    let image = match raster.convert(target).into_dynamic() {
        DynamicImage::ImageLumaA8(mut buf) => {
            for (x, y, pixel) in buf.enumerate_pixels_mut() {
                pixel[1] = alpha.level(x, y);
            }
            DynamicImage::ImageLumaA8(buf)
        }
        DynamicImage::ImageLumaA16(mut buf) => {
            for (x, y, pixel) in buf.enumerate_pixels_mut() {
                pixel[1] = u16::from(alpha.level(x, y)) * 257;
            }
            DynamicImage::ImageLumaA16(buf)
        }
        DynamicImage::ImageRgba16(mut buf) => {
            for (x, y, pixel) in buf.enumerate_pixels_mut() {
                pixel[3] = u16::from(alpha.level(x, y)) * 257;
            }
            DynamicImage::ImageRgba16(buf)
        }
        DynamicImage::ImageRgba32F(mut buf) => {
            for (x, y, pixel) in buf.enumerate_pixels_mut() {
                pixel[3] = f32::from(alpha.level(x, y)) / 255.0;
            }
            DynamicImage::ImageRgba32F(buf)
        }
        other => {
            let mut buf = other.into_rgba8();
            for (x, y, pixel) in buf.enumerate_pixels_mut() {
                pixel[3] = alpha.level(x, y);
            }
            DynamicImage::ImageRgba8(buf)
        }
    };
    Raster::Direct(image)
}

/// Quantize a normalized channel to 8 bits.
pub(crate) fn q8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Quantize a normalized channel to 16 bits.
pub(crate) fn q16(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

/// A single-value color addresses a palette entry directly.
fn palette_index(color: Option<&Color>) -> Result<Option<u8>> {
    let value = match color {
        Some(Color::Intensity(value)) => *value,
        Some(Color::Channels(values)) if values.len() == 1 => values[0],
        _ => return Ok(None),
    };
    let [v, ..] = Color::Intensity(value).resolve(Mode::P)?;
    Ok(Some(q8(v)))
}

fn gray_ramp() -> Vec<[u8; 3]> {
    (0..=u8::MAX).map(|v| [v, v, v]).collect()
}

fn web_palette() -> Vec<[u8; 3]> {
    let step = |level: u16| (level * 51) as u8;
    let mut palette = Vec::with_capacity(usize::from(WEB_LEVELS.pow(3)));
    for r in 0..WEB_LEVELS {
        for g in 0..WEB_LEVELS {
            for b in 0..WEB_LEVELS {
                palette.push([step(r), step(g), step(b)]);
            }
        }
    }
    palette
}

fn web_index([r, g, b]: [u8; 3]) -> u8 {
    let level = |c: u8| (u16::from(c) + 25) / 51;
    (level(r) * WEB_LEVELS * WEB_LEVELS + level(g) * WEB_LEVELS + level(b)) as u8
}

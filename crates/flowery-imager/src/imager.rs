// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Imager — chainable operations on a single owned image: paste with anchors,
// masks, opacity, inversion, grayscale, rotation and flips.

use std::borrow::Cow;
use std::fmt;

use flowery_core::error::{FloweryError, Result};
use flowery_core::{Alpha, Anchor, Color, FlipAxis, Format, Mode, Size};
use image::{DynamicImage, GenericImage, GenericImageView, RgbaImage, imageops};
use tracing::{debug, info, instrument};

use crate::position::resolve_position;
use crate::raster::{AlphaSource, Fill, IndexedImage, Raster, put_alpha};
use crate::transform::{self, RotateOptions};
use crate::transparency;

/// A single image with chainable, in-place operations.
///
/// Every operation computes a complete new raster before installing it, so a
/// failed call leaves the image untouched.
///
/// ```ignore
/// let mut card = Imager::open("background.png")?;
/// let badge = Imager::open("badge.png")?;
/// card.paste(&badge, (card.width() as i64, 0), Anchor::RightTop, false)
///     .rotate(15.0, &RotateOptions::default())?
///     .opacity(0.8)?;
/// let url = card.to_data_url(Format::Png, &EncodeOptions::default())?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Imager {
    /// The current working image.
    raster: Raster,
    /// Container format the image was decoded from, if any.
    format: Option<Format>,
}

impl Imager {
    // -- Construction ---------------------------------------------------------

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_raster(Raster::from_dynamic(image), None)
    }

    /// Wrap a palette image.
    pub fn from_indexed(image: IndexedImage) -> Self {
        Self::from_raster(Raster::Indexed(image), None)
    }

    pub(crate) fn from_raster(raster: Raster, format: Option<Format>) -> Self {
        Self { raster, format }
    }

    /// Create a blank canvas. Without a color every channel is zero, which is
    /// transparent black in modes with alpha.
    #[instrument(skip(size, color))]
    pub fn new(mode: Mode, size: impl Into<Size>, color: Option<Color>) -> Result<Self> {
        let size = size.into();
        if size.is_empty() {
            return Err(FloweryError::InvalidSize(format!(
                "canvas must be at least 1x1, got {size}"
            )));
        }
        let raster = match mode {
            Mode::P => Raster::Indexed(IndexedImage::filled(size, color.as_ref())?),
            _ => Raster::Direct(Fill::resolve(color.as_ref(), mode)?.canvas(mode, size)),
        };
        debug!(%size, "Canvas created");
        Ok(Self::from_raster(raster, None))
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.raster.dimensions().0
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.raster.dimensions().1
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.raster.dimensions()
    }

    pub fn mode(&self) -> Mode {
        self.raster.mode()
    }

    /// Format the image was decoded from; `None` for images built in memory.
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    pub fn channel_count(&self) -> u8 {
        self.mode().channel_count()
    }

    pub fn has_alpha(&self) -> bool {
        self.mode().has_alpha()
    }

    /// Transparent palette index, for `P` images.
    pub fn transparency(&self) -> Option<u8> {
        match &self.raster {
            Raster::Indexed(image) => image.transparent(),
            Raster::Direct(_) => None,
        }
    }

    /// Color table, for `P` images.
    pub fn palette(&self) -> Option<&[[u8; 3]]> {
        match &self.raster {
            Raster::Indexed(image) => Some(image.palette()),
            Raster::Direct(_) => None,
        }
    }

    /// Per-band `(min, max)` in the mode's native scale.
    pub fn extrema(&self) -> Vec<(f32, f32)> {
        transparency::extrema(&self.raster)
    }

    /// Whether any pixel is less than fully opaque.
    pub fn has_transparency(&self) -> bool {
        transparency::has_transparency(&self.raster)
    }

    /// Borrow the underlying raster.
    pub fn as_raster(&self) -> &Raster {
        &self.raster
    }

    /// View as a `DynamicImage`. Borrowed for direct images; palettes are
    /// expanded into a new buffer.
    pub fn as_dynamic(&self) -> Cow<'_, DynamicImage> {
        self.raster.to_dynamic()
    }

    /// Consume the imager and return the underlying raster.
    pub fn into_raster(self) -> Raster {
        self.raster
    }

    /// Consume the imager and return a `DynamicImage`; palettes are expanded.
    pub fn into_dynamic(self) -> DynamicImage {
        self.raster.into_dynamic()
    }

    // -- Operations (mutate in place, return &mut Self) -------------------------

    /// Convert to another mode.
    #[instrument(skip(self), fields(from = %self.mode()))]
    pub fn convert(&mut self, mode: Mode) -> &mut Self {
        self.raster = self.raster.convert(mode);
        self
    }

    /// Paste `src` so that its `anchor` lands on `position`.
    ///
    /// When neither image has transparent pixels the source is written over
    /// the destination directly and the mode is kept. Otherwise both are
    /// alpha-composited and the result is RGBA. With `reverse`, the existing
    /// content stays on top.
    #[instrument(skip(self, src), fields(src_w = src.width(), src_h = src.height()))]
    pub fn paste(
        &mut self,
        src: &Imager,
        position: (i64, i64),
        anchor: Anchor,
        reverse: bool,
    ) -> &mut Self {
        let (x, y) = resolve_position(src.size(), position, anchor);

        if !(src.has_transparency() || self.has_transparency()) {
            if reverse {
                debug!("Opaque paste underneath opaque image, nothing visible changes");
                return self;
            }
            debug!(x, y, "Direct paste");
            self.raster = match &self.raster {
                Raster::Indexed(dest) => {
                    let plane = dest.remap(&src.raster.to_rgba8());
                    let mut indices = dest.indices().clone();
                    imageops::replace(&mut indices, &plane, x, y);
                    Raster::Indexed(dest.with_indices(indices))
                }
                Raster::Direct(dest) => {
                    let top = src.raster.convert(self.raster.mode()).into_dynamic();
                    let mut bottom = dest.clone();
                    replace_same_layout(&mut bottom, &top, x, y);
                    Raster::Direct(bottom)
                }
            };
            return self;
        }

        debug!(x, y, reverse, "Alpha-composited paste");
        let (w, h) = self.size();
        let mut base = self.raster.to_rgba8();
        let mut layer = RgbaImage::new(w, h);
        imageops::replace(&mut layer, &src.raster.to_rgba8(), x, y);
        if reverse {
            std::mem::swap(&mut base, &mut layer);
        }
        imageops::overlay(&mut base, &layer, 0, 0);
        self.raster = Raster::Direct(DynamicImage::ImageRgba8(base));
        self
    }

    /// Use the luminance of `mask` as this image's alpha channel.
    ///
    /// The mask must have the same dimensions as the image.
    #[instrument(skip(self, mask))]
    pub fn apply_mask(&mut self, mask: &Imager) -> Result<&mut Self> {
        if mask.size() != self.size() {
            return Err(FloweryError::SizeMismatch {
                expected: self.size(),
                actual: mask.size(),
            });
        }
        let band = mask.raster.to_luma8();
        self.raster = put_alpha(&self.raster, AlphaSource::Band(&band));
        Ok(self)
    }

    /// Invert colors. The alpha channel is dropped first; palette images
    /// invert their color table.
    #[instrument(skip(self), fields(mode = %self.mode()))]
    pub fn invert(&mut self) -> &mut Self {
        self.raster = match &self.raster {
            Raster::Indexed(image) => Raster::Indexed(image.inverted()),
            Raster::Direct(_) => {
                let mut image = self
                    .raster
                    .convert(self.raster.mode().without_alpha())
                    .into_dynamic();
                image.invert();
                Raster::Direct(image)
            }
        };
        self
    }

    /// Convert to 8-bit grayscale (`L`).
    #[instrument(skip(self), fields(from = %self.mode()))]
    pub fn grayscale(&mut self) -> &mut Self {
        self.convert(Mode::L)
    }

    /// Rotate counter-clockwise by `angle` degrees.
    #[instrument(skip(self, options), fields(expand = options.expand))]
    pub fn rotate(&mut self, angle: f32, options: &RotateOptions) -> Result<&mut Self> {
        self.raster = transform::rotate(&self.raster, angle, options)?;
        Ok(self)
    }

    /// Mirror along `axis`.
    #[instrument(skip(self))]
    pub fn flip(&mut self, axis: FlipAxis) -> &mut Self {
        self.raster = transform::flip(&self.raster, axis);
        self
    }

    /// Set a uniform opacity, either as a fraction (`0.0..=1.0`) or an 8-bit
    /// level (`0..=255`). The image gains an alpha channel if it has none.
    #[instrument(skip(self, alpha))]
    pub fn opacity(&mut self, alpha: impl Into<Alpha>) -> Result<&mut Self> {
        let level = alpha.into().level()?;
        info!(level, "Setting opacity");
        self.raster = put_alpha(&self.raster, AlphaSource::Constant(level));
        Ok(self)
    }
}

impl From<DynamicImage> for Imager {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

impl fmt::Display for Imager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.size();
        write!(f, "Imager(mode={} size={}x{})", self.mode(), w, h)
    }
}

/// Overwrite a region of `bottom` with `top`. Both images are expected to
/// share a layout; mixed layouts go through 8-bit RGBA.
fn replace_same_layout(bottom: &mut DynamicImage, top: &DynamicImage, x: i64, y: i64) {
    match (bottom, top) {
        (DynamicImage::ImageLuma8(b), DynamicImage::ImageLuma8(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageLumaA8(b), DynamicImage::ImageLumaA8(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageRgb8(b), DynamicImage::ImageRgb8(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageRgba8(b), DynamicImage::ImageRgba8(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageLuma16(b), DynamicImage::ImageLuma16(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageLumaA16(b), DynamicImage::ImageLumaA16(t)) => {
            imageops::replace(b, t, x, y)
        }
        (DynamicImage::ImageRgb16(b), DynamicImage::ImageRgb16(t)) => imageops::replace(b, t, x, y),
        (DynamicImage::ImageRgba16(b), DynamicImage::ImageRgba16(t)) => {
            imageops::replace(b, t, x, y)
        }
        (DynamicImage::ImageRgb32F(b), DynamicImage::ImageRgb32F(t)) => {
            imageops::replace(b, t, x, y)
        }
        (DynamicImage::ImageRgba32F(b), DynamicImage::ImageRgba32F(t)) => {
            imageops::replace(b, t, x, y)
        }
        (bottom, top) => {
            let (bw, bh) = (i64::from(bottom.width()), i64::from(bottom.height()));
            for (dx, dy, pixel) in top.pixels() {
                let (tx, ty) = (x + i64::from(dx), y + i64::from(dy));
                if (0..bw).contains(&tx) && (0..bh).contains(&ty) {
                    bottom.put_pixel(tx as u32, ty as u32, pixel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba};

    fn solid_rgb(w: u32, h: u32, rgb: [u8; 3]) -> Imager {
        Imager::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(rgb))))
    }

    fn solid_rgba(w: u32, h: u32, rgba: [u8; 4]) -> Imager {
        Imager::from_dynamic(DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba(rgba))))
    }

    fn rgba_at(imager: &Imager, x: u32, y: u32) -> [u8; 4] {
        imager.as_raster().to_rgba8().get_pixel(x, y).0
    }

    #[test]
    fn new_square_canvas() {
        let canvas = Imager::new(Mode::Rgba, 5u32, None).unwrap();
        assert_eq!(canvas.size(), (5, 5));
        assert_eq!(rgba_at(&canvas, 2, 2), [0, 0, 0, 0]);
        assert!(canvas.has_transparency());
    }

    #[test]
    fn new_with_color() {
        let canvas = Imager::new(Mode::Rgb, (3u32, 2u32), Some(Color::from("#102030"))).unwrap();
        assert_eq!(canvas.size(), (3, 2));
        assert_eq!(canvas.to_bytes()[..3], [0x10, 0x20, 0x30]);

        let gray = Imager::new(Mode::L, 2u32, Some(Color::Intensity(200.0))).unwrap();
        assert_eq!(gray.to_bytes(), vec![200; 4]);
    }

    #[test]
    fn new_rejects_bad_input() {
        assert!(matches!(
            Imager::new(Mode::Rgb, (0u32, 4u32), None),
            Err(FloweryError::InvalidSize(_))
        ));
        assert!(matches!(
            Imager::new(Mode::Rgb, 4u32, Some(Color::from("blurple"))),
            Err(FloweryError::InvalidColor(_))
        ));
    }

    #[test]
    fn opaque_paste_keeps_mode() {
        let mut dest = solid_rgb(10, 10, [0, 0, 0]);
        let src = solid_rgb(4, 4, [255, 255, 255]);
        dest.paste(&src, (10, 10), Anchor::RightBottom, false);
        assert_eq!(dest.mode(), Mode::Rgb);
        assert_eq!(rgba_at(&dest, 6, 6), [255, 255, 255, 255]);
        assert_eq!(rgba_at(&dest, 5, 5), [0, 0, 0, 255]);
    }

    #[test]
    fn opaque_rgba_paste_stays_direct() {
        let mut dest = solid_rgba(6, 6, [1, 2, 3, 255]);
        let src = solid_rgb(2, 2, [9, 9, 9]);
        dest.paste(&src, (3, 3), Anchor::MiddleMiddle, false);
        assert_eq!(dest.mode(), Mode::Rgba);
        assert_eq!(rgba_at(&dest, 2, 2), [9, 9, 9, 255]);
    }

    #[test]
    fn grayscale_alpha_source_pastes_directly() {
        let mut dest = solid_rgb(4, 4, [0, 0, 0]);
        let src = Imager::from_dynamic(DynamicImage::ImageLumaA8(image::ImageBuffer::from_pixel(
            2,
            2,
            image::LumaA([200, 0]),
        )));
        dest.paste(&src, (0, 0), Anchor::LeftTop, false);
        assert_eq!(dest.mode(), Mode::Rgb);
        assert_eq!(rgba_at(&dest, 1, 1), [200, 200, 200, 255]);
        assert_eq!(rgba_at(&dest, 2, 2), [0, 0, 0, 255]);
    }

    #[test]
    fn reverse_opaque_paste_is_noop() {
        let mut dest = solid_rgb(4, 4, [0, 0, 0]);
        let before = dest.clone();
        dest.paste(&solid_rgb(2, 2, [255, 0, 0]), (0, 0), Anchor::LeftTop, true);
        assert_eq!(dest, before);
    }

    #[test]
    fn transparent_paste_composites() {
        let mut dest = solid_rgb(4, 4, [0, 0, 255]);
        let src = solid_rgba(2, 2, [255, 0, 0, 0]);
        dest.paste(&src, (0, 0), Anchor::LeftTop, false);
        assert_eq!(dest.mode(), Mode::Rgba);
        // Fully transparent source leaves the destination visible.
        assert_eq!(rgba_at(&dest, 0, 0), [0, 0, 255, 255]);

        let mut dest = solid_rgba(4, 4, [0, 0, 255, 255]);
        let mut half = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        half.put_pixel(1, 1, Rgba([255, 0, 0, 0]));
        let src = Imager::from_dynamic(DynamicImage::ImageRgba8(half));
        dest.paste(&src, (1, 1), Anchor::LeftTop, false);
        assert_eq!(rgba_at(&dest, 1, 1), [255, 0, 0, 255]);
        assert_eq!(rgba_at(&dest, 2, 2), [0, 0, 255, 255]);
        assert_eq!(rgba_at(&dest, 0, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn reverse_transparent_paste_keeps_destination_on_top() {
        let mut buf = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        buf.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        let mut dest = Imager::from_dynamic(DynamicImage::ImageRgba8(buf));
        let src = solid_rgba(4, 4, [255, 0, 0, 255]);
        dest.paste(&src, (0, 0), Anchor::LeftTop, true);
        // The hole in the destination shows the source beneath it.
        assert_eq!(rgba_at(&dest, 0, 0), [255, 0, 0, 255]);
        assert_eq!(rgba_at(&dest, 3, 3), [0, 0, 255, 255]);
    }

    #[test]
    fn paste_clips_out_of_bounds() {
        let mut dest = solid_rgb(4, 4, [0, 0, 0]);
        dest.paste(&solid_rgb(4, 4, [255, 255, 255]), (-2, -2), Anchor::LeftTop, false);
        assert_eq!(rgba_at(&dest, 1, 1), [255, 255, 255, 255]);
        assert_eq!(rgba_at(&dest, 2, 2), [0, 0, 0, 255]);
        assert_eq!(dest.size(), (4, 4));
    }

    #[test]
    fn paste_into_palette_image() {
        let mut dest = Imager::new(Mode::P, 4u32, Some(Color::Intensity(0.0))).unwrap();
        dest.paste(&solid_rgb(2, 2, [255, 255, 255]), (0, 0), Anchor::LeftTop, false);
        assert_eq!(dest.mode(), Mode::P);
        assert_eq!(rgba_at(&dest, 1, 1), [255, 255, 255, 255]);
        assert_eq!(rgba_at(&dest, 3, 3), [0, 0, 0, 255]);
    }

    #[test]
    fn mask_sets_alpha_from_luminance() {
        let mut image = solid_rgb(2, 2, [10, 20, 30]);
        let mut plane = GrayImage::from_pixel(2, 2, Luma([255]));
        plane.put_pixel(0, 1, Luma([0]));
        let mask = Imager::from_dynamic(DynamicImage::ImageLuma8(plane));
        image.apply_mask(&mask).unwrap();
        assert_eq!(image.mode(), Mode::Rgba);
        assert_eq!(rgba_at(&image, 0, 1), [10, 20, 30, 0]);
        assert_eq!(rgba_at(&image, 1, 1), [10, 20, 30, 255]);
    }

    #[test]
    fn mask_size_mismatch_leaves_image_untouched() {
        let mut image = solid_rgb(4, 4, [1, 1, 1]);
        let before = image.clone();
        let mask = solid_rgb(3, 4, [255, 255, 255]);
        let result = image.apply_mask(&mask);
        assert!(matches!(
            result,
            Err(FloweryError::SizeMismatch {
                expected: (4, 4),
                actual: (3, 4)
            })
        ));
        assert_eq!(image, before);
    }

    #[test]
    fn invert_drops_alpha() {
        let mut image = solid_rgba(2, 2, [10, 20, 30, 40]);
        image.invert();
        assert_eq!(image.mode(), Mode::Rgb);
        assert!(!image.has_alpha());
        assert_eq!(image.to_bytes()[..3], [245, 235, 225]);
    }

    #[test]
    fn invert_palette_keeps_mode() {
        let mut image = Imager::new(Mode::P, 2u32, Some(Color::from("red"))).unwrap();
        image.invert();
        assert_eq!(image.mode(), Mode::P);
        assert_eq!(image.palette().unwrap(), &[[0, 255, 255]]);
    }

    #[test]
    fn grayscale_is_l() {
        let mut image = solid_rgba(2, 2, [255, 255, 255, 10]);
        image.grayscale();
        assert_eq!(image.mode(), Mode::L);
        assert_eq!(image.to_bytes(), vec![255; 4]);
    }

    #[test]
    fn opacity_fraction_and_level_agree() {
        let mut by_fraction = solid_rgb(2, 2, [5, 6, 7]);
        let mut by_level = by_fraction.clone();
        by_fraction.opacity(1.0).unwrap();
        by_level.opacity(255).unwrap();
        assert_eq!(by_fraction, by_level);
        assert_eq!(by_fraction.mode(), Mode::Rgba);
        assert!(!by_fraction.has_transparency());
    }

    #[test]
    fn opacity_rejects_out_of_range_without_mutation() {
        let mut image = solid_rgb(2, 2, [5, 6, 7]);
        let before = image.clone();
        assert!(matches!(image.opacity(1.5), Err(FloweryError::InvalidOpacity(_))));
        assert!(matches!(image.opacity(256), Err(FloweryError::InvalidOpacity(_))));
        assert!(matches!(image.opacity(-1), Err(FloweryError::InvalidOpacity(_))));
        assert!(matches!(image.opacity(-0.1), Err(FloweryError::InvalidOpacity(_))));
        assert_eq!(image, before);
    }

    #[test]
    fn opacity_on_grayscale_gives_la() {
        let mut image = Imager::new(Mode::L, 2u32, Some(Color::Intensity(9.0))).unwrap();
        image.opacity(0.5).unwrap();
        assert_eq!(image.mode(), Mode::La);
        assert_eq!(image.extrema()[1], (127.0, 127.0));
        // Grayscale alpha does not switch paste onto the compositing path.
        assert!(!image.has_transparency());
    }

    #[test]
    fn flip_xy_equals_half_turn() {
        let buf = RgbaImage::from_fn(5, 3, |x, y| Rgba([x as u8 * 40, y as u8 * 80, 7, 255]));
        let mut flipped = Imager::from_dynamic(DynamicImage::ImageRgba8(buf));
        let mut rotated = flipped.clone();
        flipped.flip(FlipAxis::XY);
        rotated.rotate(180.0, &RotateOptions::default()).unwrap();
        assert_eq!(flipped.to_bytes(), rotated.to_bytes());
    }

    #[test]
    fn operations_chain() {
        let mut image = solid_rgb(8, 8, [200, 100, 50]);
        image
            .paste(&solid_rgb(2, 2, [0, 0, 0]), (4, 4), Anchor::MiddleMiddle, false)
            .flip(FlipAxis::Y)
            .grayscale()
            .opacity(0.5)
            .unwrap()
            .invert();
        assert_eq!(image.mode(), Mode::L);
        assert_eq!(image.size(), (8, 8));
    }

    #[test]
    fn display_summary() {
        let image = solid_rgba(10, 20, [0, 0, 0, 0]);
        assert_eq!(image.to_string(), "Imager(mode=RGBA size=10x20)");
    }

    #[test]
    fn clone_is_independent() {
        let original = solid_rgb(3, 3, [1, 2, 3]);
        let mut copy = original.clone();
        copy.invert();
        assert_eq!(original.to_bytes()[..3], [1, 2, 3]);
        assert_ne!(copy, original);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transparency detection and per-band extrema.

use image::{DynamicImage, ImageBuffer, Pixel};

use crate::raster::Raster;

/// Whether compositing with this raster needs the alpha-aware path.
///
/// Palette images count as transparent when at least one pixel uses the
/// transparent index. Color images with an alpha band (RGBA at any depth)
/// count as transparent when some pixel is below full opacity. Everything
/// else, grayscale with alpha included, is treated as opaque.
pub fn has_transparency(raster: &Raster) -> bool {
    match raster {
        Raster::Indexed(image) => image
            .transparent()
            .is_some_and(|clear| image.indices().pixels().any(|p| p[0] == clear)),
        Raster::Direct(DynamicImage::ImageRgba8(buf)) => alpha_below(buf, f32::from(u8::MAX)),
        Raster::Direct(DynamicImage::ImageRgba16(buf)) => alpha_below(buf, f32::from(u16::MAX)),
        Raster::Direct(DynamicImage::ImageRgba32F(buf)) => alpha_below(buf, 1.0),
        Raster::Direct(_) => false,
    }
}

fn alpha_below<P>(buf: &ImageBuffer<P, Vec<P::Subpixel>>, opaque: f32) -> bool
where
    P: Pixel,
    P::Subpixel: Into<f32>,
{
    buf.pixels()
        .filter_map(|pixel| pixel.channels().last().copied())
        .any(|alpha| Into::<f32>::into(alpha) < opaque)
}

/// Minimum and maximum value of every band, in the mode's native scale.
/// Palette images report the extrema of their indices.
pub fn extrema(raster: &Raster) -> Vec<(f32, f32)> {
    match raster {
        Raster::Indexed(image) => band_extrema(image.indices()),
        Raster::Direct(image) => match image {
            DynamicImage::ImageLuma8(buf) => band_extrema(buf),
            DynamicImage::ImageLumaA8(buf) => band_extrema(buf),
            DynamicImage::ImageRgb8(buf) => band_extrema(buf),
            DynamicImage::ImageRgba8(buf) => band_extrema(buf),
            DynamicImage::ImageLuma16(buf) => band_extrema(buf),
            DynamicImage::ImageLumaA16(buf) => band_extrema(buf),
            DynamicImage::ImageRgb16(buf) => band_extrema(buf),
            DynamicImage::ImageRgba16(buf) => band_extrema(buf),
            DynamicImage::ImageRgb32F(buf) => band_extrema(buf),
            DynamicImage::ImageRgba32F(buf) => band_extrema(buf),
            other => band_extrema(&other.to_rgba8()),
        },
    }
}

fn band_extrema<P>(buf: &ImageBuffer<P, Vec<P::Subpixel>>) -> Vec<(f32, f32)>
where
    P: Pixel,
    P::Subpixel: Into<f32>,
{
    let mut bands = vec![(f32::INFINITY, f32::NEG_INFINITY); usize::from(P::CHANNEL_COUNT)];
    for pixel in buf.pixels() {
        for (band, value) in bands.iter_mut().zip(pixel.channels()) {
            let value: f32 = (*value).into();
            band.0 = band.0.min(value);
            band.1 = band.1.max(value);
        }
    }
    if buf.width() == 0 || buf.height() == 0 {
        bands.fill((0.0, 0.0));
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::IndexedImage;
    use image::{GrayImage, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};

    fn palette_image(transparent: Option<u8>, use_index: u8) -> Raster {
        let mut plane = GrayImage::from_pixel(4, 4, Luma([1]));
        plane.put_pixel(2, 3, Luma([use_index]));
        let image = IndexedImage::new(plane, vec![[0, 0, 0], [255, 255, 255], [9, 9, 9]], transparent)
            .expect("valid palette");
        Raster::Indexed(image)
    }

    #[test]
    fn palette_without_transparent_pixels_is_opaque() {
        assert!(!has_transparency(&palette_image(Some(0), 2)));
        assert!(!has_transparency(&palette_image(None, 0)));
    }

    #[test]
    fn palette_using_transparent_index_is_transparent() {
        assert!(has_transparency(&palette_image(Some(0), 0)));
    }

    #[test]
    fn rgba_alpha_extrema() {
        let mut buf = RgbaImage::from_pixel(3, 3, Rgba([10, 20, 30, 255]));
        let opaque = Raster::Direct(DynamicImage::ImageRgba8(buf.clone()));
        assert!(!has_transparency(&opaque));

        buf.put_pixel(1, 1, Rgba([10, 20, 30, 254]));
        let translucent = Raster::Direct(DynamicImage::ImageRgba8(buf));
        assert!(has_transparency(&translucent));
        assert_eq!(extrema(&translucent)[3], (254.0, 255.0));
    }

    #[test]
    fn modes_without_alpha_are_opaque() {
        let rgb = Raster::Direct(DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]))));
        assert!(!has_transparency(&rgb));
    }

    #[test]
    fn deep_alpha_uses_native_scale() {
        let mut buf = ImageBuffer::from_pixel(2, 2, Rgba([100u16, 0, 0, u16::MAX]));
        let opaque = Raster::Direct(DynamicImage::ImageRgba16(buf.clone()));
        assert!(!has_transparency(&opaque));

        buf.put_pixel(0, 0, Rgba([100, 0, 0, 1000]));
        let translucent = Raster::Direct(DynamicImage::ImageRgba16(buf));
        assert!(has_transparency(&translucent));
        assert_eq!(extrema(&translucent)[3], (1000.0, 65535.0));
    }

    #[test]
    fn grayscale_alpha_is_never_transparent() {
        let la = ImageBuffer::from_pixel(2, 2, LumaA([200u8, 0]));
        assert!(!has_transparency(&Raster::Direct(DynamicImage::ImageLumaA8(la))));

        let la16 = ImageBuffer::from_pixel(2, 2, LumaA([200u16, 0]));
        let raster = Raster::Direct(DynamicImage::ImageLumaA16(la16));
        assert!(!has_transparency(&raster));
        assert_eq!(extrema(&raster), vec![(200.0, 200.0), (0.0, 0.0)]);
    }

    #[test]
    fn empty_image_is_opaque() {
        let empty = Raster::Direct(DynamicImage::ImageRgba8(RgbaImage::new(0, 0)));
        assert!(!has_transparency(&empty));
        assert_eq!(extrema(&empty), vec![(0.0, 0.0); 4]);
    }
}

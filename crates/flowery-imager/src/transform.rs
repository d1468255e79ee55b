// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometric transforms — rotation about an arbitrary center with optional
// canvas expansion, and mirroring. Resampling is done by `imageproc`.

use flowery_core::error::Result;
use flowery_core::{Color, FlipAxis, FloweryConfig, Resample};
use image::{DynamicImage, ImageBuffer, imageops};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, instrument};

use crate::raster::{Fill, Raster};

/// Angle tolerance (degrees) for the lossless quarter-turn fast paths.
const RIGHT_ANGLE_EPSILON: f32 = 0.01;

/// Parameters for [`rotate`].
#[derive(Debug, Clone, PartialEq)]
pub struct RotateOptions {
    /// Resampling filter. Palette images always use nearest.
    pub resample: Resample,
    /// Grow the canvas so the whole rotated image fits.
    pub expand: bool,
    /// Rotation center; defaults to the image center. Origin is top-left.
    pub center: Option<(f32, f32)>,
    /// Offset applied after rotation.
    pub translate: Option<(f32, f32)>,
    /// Color of the area outside the rotated image. Defaults to all-zero
    /// (the transparent index for palette images).
    pub fill: Option<Color>,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            resample: Resample::Bicubic,
            expand: false,
            center: None,
            translate: None,
            fill: None,
        }
    }
}

impl RotateOptions {
    pub fn with_resample(resample: Resample) -> Self {
        Self {
            resample,
            ..Self::default()
        }
    }
}

impl From<&FloweryConfig> for RotateOptions {
    fn from(config: &FloweryConfig) -> Self {
        Self::with_resample(config.rotate_resample)
    }
}

/// Rotate counter-clockwise by `angle` degrees.
#[instrument(skip(raster, options), fields(expand = options.expand))]
pub fn rotate(raster: &Raster, angle: f32, options: &RotateOptions) -> Result<Raster> {
    if options.center.is_none() && options.translate.is_none() {
        if let Some(turned) = quarter_turn(raster, angle, options.expand) {
            return Ok(turned);
        }
    }

    let (w, h) = raster.dimensions();
    let center = options
        .center
        .unwrap_or((w as f32 / 2.0, h as f32 / 2.0));
    let (tx, ty) = options.translate.unwrap_or((0.0, 0.0));
    let theta = angle.to_radians();

    let (out_w, out_h) = if options.expand {
        bounding_size((w, h), center, theta)
    } else {
        (w, h)
    };
    let shift_x = (out_w as f32 - w as f32) / 2.0;
    let shift_y = (out_h as f32 - h as f32) / 2.0;

    // Projection::rotate turns clockwise in image space, so negate for CCW.
    let projection = Projection::translate(center.0 + tx + shift_x, center.1 + ty + shift_y)
        * Projection::rotate(-theta)
        * Projection::translate(-center.0, -center.1);

    debug!(angle, out_w, out_h, ?center, "Rotating with resampling");

    let rotated = match raster {
        Raster::Indexed(image) => {
            let fill = image.index_for(options.fill.as_ref())?;
            let mut out = ImageBuffer::new(out_w, out_h);
            warp_into(
                image.indices(),
                &projection,
                Interpolation::Nearest,
                image::Luma([fill]),
                &mut out,
            );
            Raster::Indexed(image.with_indices(out))
        }
        Raster::Direct(image) => {
            let mode = raster.mode();
            let fill = Fill::resolve(options.fill.as_ref(), mode)?;
            let interpolation = interpolation(options.resample);

            macro_rules! warp {
                ($buf:expr, $pixel:expr, $variant:path) => {{
                    let mut out = ImageBuffer::new(out_w, out_h);
                    warp_into($buf, &projection, interpolation, $pixel, &mut out);
                    $variant(out)
                }};
            }

            let warped = match image {
                DynamicImage::ImageLuma8(buf) => warp!(buf, fill.luma8(), DynamicImage::ImageLuma8),
                DynamicImage::ImageLumaA8(buf) => {
                    warp!(buf, fill.luma_alpha8(), DynamicImage::ImageLumaA8)
                }
                DynamicImage::ImageRgb8(buf) => warp!(buf, fill.rgb8(), DynamicImage::ImageRgb8),
                DynamicImage::ImageRgba8(buf) => warp!(buf, fill.rgba8(), DynamicImage::ImageRgba8),
                DynamicImage::ImageLuma16(buf) => {
                    warp!(buf, fill.luma16(), DynamicImage::ImageLuma16)
                }
                DynamicImage::ImageLumaA16(buf) => {
                    warp!(buf, fill.luma_alpha16(), DynamicImage::ImageLumaA16)
                }
                DynamicImage::ImageRgb16(buf) => warp!(buf, fill.rgb16(), DynamicImage::ImageRgb16),
                DynamicImage::ImageRgba16(buf) => {
                    warp!(buf, fill.rgba16(), DynamicImage::ImageRgba16)
                }
                // Float images are resampled at 16-bit precision.
                other => {
                    let deep = other.to_rgba16();
                    let warped = warp!(&deep, fill.rgba16(), DynamicImage::ImageRgba16);
                    Raster::Direct(warped).convert(mode).into_dynamic()
                }
            };
            Raster::Direct(warped)
        }
    };
    Ok(rotated)
}

/// Mirror the raster. `XY` is a 180 degree rotation.
pub fn flip(raster: &Raster, axis: FlipAxis) -> Raster {
    match raster {
        Raster::Direct(image) => Raster::Direct(match axis {
            FlipAxis::X => image.flipv(),
            FlipAxis::Y => image.fliph(),
            FlipAxis::XY => image.rotate180(),
        }),
        Raster::Indexed(image) => {
            let plane = image.indices();
            let flipped = match axis {
                FlipAxis::X => imageops::flip_vertical(plane),
                FlipAxis::Y => imageops::flip_horizontal(plane),
                FlipAxis::XY => imageops::rotate180(plane),
            };
            Raster::Indexed(image.with_indices(flipped))
        }
    }
}

/// Lossless rotation for multiples of 90 degrees. Quarter turns are only
/// taken when the canvas may change shape (expanding, or a square image).
fn quarter_turn(raster: &Raster, angle: f32, expand: bool) -> Option<Raster> {
    let normalized = angle.rem_euclid(360.0);
    let near = |target: f32| (normalized - target).abs() < RIGHT_ANGLE_EPSILON;
    let (w, h) = raster.dimensions();
    let may_reshape = expand || w == h;

    if near(0.0) || near(360.0) {
        return Some(raster.clone());
    }
    if near(180.0) {
        return Some(flip(raster, FlipAxis::XY));
    }

    // imageops turns clockwise: 90 CCW is rotate270, 270 CCW is rotate90.
    let turned = match raster {
        Raster::Direct(image) if near(90.0) && may_reshape => Raster::Direct(image.rotate270()),
        Raster::Direct(image) if near(270.0) && may_reshape => Raster::Direct(image.rotate90()),
        Raster::Indexed(image) if near(90.0) && may_reshape => {
            Raster::Indexed(image.with_indices(imageops::rotate270(image.indices())))
        }
        Raster::Indexed(image) if near(270.0) && may_reshape => {
            Raster::Indexed(image.with_indices(imageops::rotate90(image.indices())))
        }
        _ => return None,
    };
    debug!(angle = normalized, "Quarter-turn fast path");
    Some(turned)
}

/// Canvas size that holds the image's corners after rotating by `theta`
/// (radians, counter-clockwise) about `center`.
fn bounding_size((w, h): (u32, u32), center: (f32, f32), theta: f32) -> (u32, u32) {
    let (sin, cos) = theta.sin_cos();
    let corners = [(0.0, 0.0), (w as f32, 0.0), (0.0, h as f32), (w as f32, h as f32)];
    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for (x, y) in corners {
        let (dx, dy) = (x - center.0, y - center.1);
        let rx = dx * cos + dy * sin;
        let ry = -dx * sin + dy * cos;
        min_x = min_x.min(rx);
        max_x = max_x.max(rx);
        min_y = min_y.min(ry);
        max_y = max_y.max(ry);
    }
    // Trim float noise so exact fits don't gain a pixel.
    let span = |min: f32, max: f32| {
        let extent = (max - 1e-3).ceil() - (min + 1e-3).floor();
        extent.max(1.0) as u32
    };
    (span(min_x, max_x), span(min_y, max_y))
}

fn interpolation(resample: Resample) -> Interpolation {
    match resample {
        Resample::Nearest => Interpolation::Nearest,
        Resample::Bilinear => Interpolation::Bilinear,
        Resample::Bicubic => Interpolation::Bicubic,
    }
}

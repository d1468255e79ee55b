// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoding and encoding — open from paths, bytes and readers; save to paths
// and writers; export as raw bytes, base64 or data URLs.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, Seek, Write};
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flowery_core::error::{FloweryError, Result};
use flowery_core::{EncodeDefaults, Format, Mode, PngCompression};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use tracing::{debug, info, instrument};

use crate::imager::Imager;
use crate::raster::Raster;

/// Default JPEG quality when none is given.
const DEFAULT_JPEG_QUALITY: u8 = 75;

/// PNG row filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PngFilter {
    NoFilter,
    Sub,
    Up,
    Avg,
    Paeth,
    #[default]
    Adaptive,
}

/// Encoder parameters, handed to the matching `image` encoder. Parameters
/// for other formats are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodeOptions {
    /// JPEG quality (1-100).
    pub jpeg_quality: Option<u8>,
    pub png_compression: Option<PngCompression>,
    pub png_filter: Option<PngFilter>,
}

impl From<&EncodeDefaults> for EncodeOptions {
    fn from(defaults: &EncodeDefaults) -> Self {
        Self {
            jpeg_quality: Some(defaults.jpeg_quality),
            png_compression: Some(defaults.png_compression),
            png_filter: None,
        }
    }
}

impl Imager {
    // -- Decoding -------------------------------------------------------------

    /// Load an image from a file path, guessing the format from its content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_formats(path, None)
    }

    /// Load an image from a file path, accepting only the listed formats.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with_formats(path: impl AsRef<Path>, formats: Option<&[Format]>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let imager = Self::from_reader(BufReader::new(file), formats)?;
        info!(
            width = imager.width(),
            height = imager.height(),
            mode = %imager.mode(),
            "Image loaded"
        );
        Ok(imager)
    }

    /// Decode an image from encoded bytes (PNG, JPEG, etc.).
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_formats(data, None)
    }

    /// Decode an image from encoded bytes, accepting only the listed formats.
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes_with_formats(data: &[u8], formats: Option<&[Format]>) -> Result<Self> {
        Self::from_reader(Cursor::new(data), formats)
    }

    /// Decode an image from any buffered, seekable reader.
    ///
    /// When `formats` is given, content that is not one of them is rejected
    /// with [`FloweryError::UnsupportedFormat`] before decoding starts.
    pub fn from_reader<R: BufRead + Seek>(reader: R, formats: Option<&[Format]>) -> Result<Self> {
        let reader = ImageReader::new(reader)
            .with_guessed_format()
            .map_err(|err| FloweryError::Decode(format!("failed to sniff format: {err}")))?;
        let detected = reader.format().and_then(format_from_image);

        if let Some(accepted) = formats {
            match detected {
                Some(format) if accepted.contains(&format) => {}
                Some(format) => {
                    return Err(FloweryError::UnsupportedFormat(format!(
                        "{format} is not one of {accepted:?}"
                    )));
                }
                None => {
                    return Err(FloweryError::UnsupportedFormat(
                        "could not identify image format".into(),
                    ));
                }
            }
        }

        let image = reader
            .decode()
            .map_err(|err| FloweryError::Decode(err.to_string()))?;
        debug!(
            width = image.width(),
            height = image.height(),
            format = ?detected,
            "Image decoded"
        );
        Ok(Self::from_raster(Raster::from_dynamic(image), detected))
    }

    // -- Encoding -------------------------------------------------------------

    /// Raw pixel bytes in the image's native layout (indices for `P`).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_raster().as_bytes().to_vec()
    }

    /// Encode into a seekable writer.
    pub fn write_to<W: Write + Seek>(
        &self,
        writer: &mut W,
        format: Format,
        options: &EncodeOptions,
    ) -> Result<()> {
        let image = encodable(self.as_raster(), format);
        let result = match format {
            Format::Jpeg => {
                let quality = options.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY);
                image.write_with_encoder(JpegEncoder::new_with_quality(&mut *writer, quality))
            }
            Format::Png => {
                let compression = match options.png_compression.unwrap_or_default() {
                    PngCompression::Fast => CompressionType::Fast,
                    PngCompression::Default => CompressionType::Default,
                    PngCompression::Best => CompressionType::Best,
                };
                let filter = match options.png_filter.unwrap_or_default() {
                    PngFilter::NoFilter => FilterType::NoFilter,
                    PngFilter::Sub => FilterType::Sub,
                    PngFilter::Up => FilterType::Up,
                    PngFilter::Avg => FilterType::Avg,
                    PngFilter::Paeth => FilterType::Paeth,
                    PngFilter::Adaptive => FilterType::Adaptive,
                };
                image.write_with_encoder(PngEncoder::new_with_quality(
                    &mut *writer,
                    compression,
                    filter,
                ))
            }
            other => image.write_to(writer, image_format(other)),
        };
        result.map_err(|err| FloweryError::Encode(format!("{format}: {err}")))
    }

    /// Encode into an in-memory buffer.
    pub fn encode(&self, format: Format, options: &EncodeOptions) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor, format, options)?;
        Ok(cursor.into_inner())
    }

    /// Encode and return the standard base64 text of the encoded bytes.
    pub fn to_base64(&self, format: Format, options: &EncodeOptions) -> Result<String> {
        Ok(STANDARD.encode(self.encode(format, options)?))
    }

    /// Encode as a `data:image/<format>;base64,<data>` URL.
    pub fn to_data_url(&self, format: Format, options: &EncodeOptions) -> Result<String> {
        let data = self.to_base64(format, options)?;
        Ok(format!("data:{};base64,{data}", format.mime_type()))
    }

    /// Base64 export using the configured default format and encoder settings.
    pub fn to_base64_with_defaults(&self, defaults: &EncodeDefaults) -> Result<String> {
        self.to_base64(defaults.format, &EncodeOptions::from(defaults))
    }

    /// Data-URL export using the configured default format and encoder settings.
    pub fn to_data_url_with_defaults(&self, defaults: &EncodeDefaults) -> Result<String> {
        self.to_data_url(defaults.format, &EncodeOptions::from(defaults))
    }

    /// Write to a file, choosing the format from the extension.
    pub fn save(&self, path: impl AsRef<Path>, options: &EncodeOptions) -> Result<()> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
            .ok_or_else(|| {
                FloweryError::UnsupportedFormat(format!(
                    "cannot infer format from {}",
                    path.display()
                ))
            })?;
        self.save_as(path, format, options)
    }

    /// Write to a file in an explicit format.
    #[instrument(skip(self, options), fields(path = %path.as_ref().display()))]
    pub fn save_as(
        &self,
        path: impl AsRef<Path>,
        format: Format,
        options: &EncodeOptions,
    ) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer, format, options)?;
        writer.flush()?;
        info!(%format, "Image saved");
        Ok(())
    }
}

/// Narrow a raster to a color type the target encoder accepts.
fn encodable(raster: &Raster, format: Format) -> DynamicImage {
    let mode = raster.mode();
    let image = raster.to_dynamic();
    match format {
        Format::Jpeg if mode.is_grayscale() => DynamicImage::ImageLuma8(image.to_luma8()),
        Format::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        Format::Png => match mode {
            Mode::Rgb32F => DynamicImage::ImageRgb16(image.to_rgb16()),
            Mode::Rgba32F => DynamicImage::ImageRgba16(image.to_rgba16()),
            _ => image.into_owned(),
        },
        Format::Tiff => match mode {
            Mode::La => DynamicImage::ImageRgba8(image.to_rgba8()),
            Mode::La16 | Mode::Rgba32F => DynamicImage::ImageRgba16(image.to_rgba16()),
            Mode::Rgb32F => DynamicImage::ImageRgb16(image.to_rgb16()),
            _ => image.into_owned(),
        },
        Format::Gif => DynamicImage::ImageRgba8(image.to_rgba8()),
        Format::Bmp | Format::WebP => match (mode.is_grayscale(), mode.has_alpha()) {
            (true, true) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
            (true, false) => DynamicImage::ImageLuma8(image.to_luma8()),
            (false, true) => DynamicImage::ImageRgba8(image.to_rgba8()),
            (false, false) => DynamicImage::ImageRgb8(image.to_rgb8()),
        },
    }
}

fn image_format(format: Format) -> ImageFormat {
    match format {
        Format::Png => ImageFormat::Png,
        Format::Jpeg => ImageFormat::Jpeg,
        Format::Bmp => ImageFormat::Bmp,
        Format::Tiff => ImageFormat::Tiff,
        Format::WebP => ImageFormat::WebP,
        Format::Gif => ImageFormat::Gif,
    }
}

fn format_from_image(format: ImageFormat) -> Option<Format> {
    match format {
        ImageFormat::Png => Some(Format::Png),
        ImageFormat::Jpeg => Some(Format::Jpeg),
        ImageFormat::Bmp => Some(Format::Bmp),
        ImageFormat::Tiff => Some(Format::Tiff),
        ImageFormat::WebP => Some(Format::WebP),
        ImageFormat::Gif => Some(Format::Gif),
        _ => None,
    }
}

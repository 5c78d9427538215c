//! Production codec built on the `image` crate — pure Rust, statically
//! linked, no system dependencies.

use super::codec::{CodecError, ImageCodec, ImageProbe, PixelFormat, TranscodeParams};
use crate::config::CanonicalFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// `image`-crate implementation of [`ImageCodec`].
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn detect(bytes: &[u8]) -> Result<(ImageFormat, PixelFormat), CodecError> {
    let format = image::guess_format(bytes)
        .map_err(|e| CodecError::Decode(format!("unrecognized image data: {e}")))?;
    let pixel = match format {
        ImageFormat::Jpeg => PixelFormat::Jpeg,
        ImageFormat::Png => PixelFormat::Png,
        ImageFormat::WebP => PixelFormat::WebP,
        _ => PixelFormat::Other,
    };
    Ok((format, pixel))
}

fn decode(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, CodecError> {
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CodecError::Decode(format!("decode failed: {e}")))
}

/// Encode to the canonical format. JPEG carries the quality setting; PNG and
/// WebP encode losslessly with the bundled encoders.
fn encode(img: &DynamicImage, format: CanonicalFormat, quality: u8) -> Result<Vec<u8>, CodecError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        CanonicalFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            // JPEG has no alpha channel
            img.to_rgb8()
                .write_with_encoder(encoder)
                .map_err(|e| CodecError::Encode(format!("JPEG encode failed: {e}")))?;
        }
        CanonicalFormat::Png => {
            img.write_to(&mut out, ImageFormat::Png)
                .map_err(|e| CodecError::Encode(format!("PNG encode failed: {e}")))?;
        }
        CanonicalFormat::WebP => {
            img.write_to(&mut out, ImageFormat::WebP)
                .map_err(|e| CodecError::Encode(format!("WebP encode failed: {e}")))?;
        }
    }
    Ok(out.into_inner())
}

impl ImageCodec for RustCodec {
    fn probe(&self, bytes: &[u8]) -> Result<ImageProbe, CodecError> {
        let (format, pixel) = detect(bytes)?;
        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| CodecError::Decode(format!("failed to read dimensions: {e}")))?;
        Ok(ImageProbe {
            width,
            height,
            format: pixel,
        })
    }

    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Vec<u8>, CodecError> {
        let (format, _) = detect(bytes)?;
        let img = decode(bytes, format)?;
        let resampled = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };
        encode(&resampled, params.format, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ExtendedColorType, ImageEncoder, RgbImage};

    /// Encode a synthetic gradient as JPEG bytes.
    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        JpegEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out.into_inner()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn probe_jpeg_dimensions_and_format() {
        let codec = RustCodec::new();
        let probe = codec.probe(&jpeg_bytes(200, 150)).unwrap();
        assert_eq!(probe.width, 200);
        assert_eq!(probe.height, 150);
        assert_eq!(probe.format, PixelFormat::Jpeg);
    }

    #[test]
    fn probe_png_format() {
        let codec = RustCodec::new();
        let probe = codec.probe(&png_bytes(64, 48)).unwrap();
        assert_eq!(probe.format, PixelFormat::Png);
    }

    #[test]
    fn probe_garbage_errors() {
        let codec = RustCodec::new();
        assert!(codec.probe(b"definitely not an image").is_err());
        assert!(codec.probe(b"").is_err());
    }

    #[test]
    fn transcode_png_to_jpeg_at_target_size() {
        let codec = RustCodec::new();
        let out = codec
            .transcode(
                &png_bytes(400, 300),
                &TranscodeParams {
                    width: 200,
                    height: 150,
                    format: CanonicalFormat::Jpeg,
                    quality: 80,
                },
            )
            .unwrap();

        let probe = codec.probe(&out).unwrap();
        assert_eq!(probe.format, PixelFormat::Jpeg);
        assert_eq!(probe.width, 200);
        assert_eq!(probe.height, 150);
    }

    #[test]
    fn transcode_same_size_reencodes_format_only() {
        let codec = RustCodec::new();
        let out = codec
            .transcode(
                &png_bytes(100, 80),
                &TranscodeParams {
                    width: 100,
                    height: 80,
                    format: CanonicalFormat::Jpeg,
                    quality: 80,
                },
            )
            .unwrap();
        let probe = codec.probe(&out).unwrap();
        assert_eq!((probe.width, probe.height), (100, 80));
        assert_eq!(probe.format, PixelFormat::Jpeg);
    }

    #[test]
    fn transcode_corrupt_input_errors() {
        let codec = RustCodec::new();
        let result = codec.transcode(
            b"garbage",
            &TranscodeParams {
                width: 10,
                height: 10,
                format: CanonicalFormat::Jpeg,
                quality: 80,
            },
        );
        assert!(result.is_err());
    }
}

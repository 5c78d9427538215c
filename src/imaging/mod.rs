//! Image decode/resample/encode — pure Rust, behind a capability trait.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Sniff format** | `image::guess_format` |
//! | **Probe dimensions** | `image::ImageReader::into_dimensions` (header only) |
//! | **Resample** | Lanczos3 via `image::DynamicImage::resize_exact` |
//! | **Encode JPEG** | `image::codecs::jpeg::JpegEncoder` (quality-carrying) |
//! | **Encode PNG / WebP** | `image::DynamicImage::write_to` |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math (unit testable)
//! - **Codec**: the [`ImageCodec`] trait everything programs against
//! - **RustCodec**: the `image`-crate production implementation

pub mod calculations;
pub mod codec;
pub mod rust_codec;

pub use codec::{CodecError, ImageCodec, ImageProbe, PixelFormat, TranscodeParams};
pub use rust_codec::RustCodec;

//! The image codec trait and its shared types.
//!
//! [`ImageCodec`] is one of the pipeline's two capability seams (the other is
//! [`FileTree`](crate::collect::FileTree)): everything that touches pixels —
//! format sniffing for the validator, the transcoder's decode/resample/encode,
//! the uploader's resize fast path — goes through it. The production
//! implementation is [`RustCodec`](super::rust_codec::RustCodec); tests use
//! the recording [`tests::MockCodec`].

use crate::config::CanonicalFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Encoded format detected from a byte stream's magic numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Jpeg,
    Png,
    WebP,
    /// Decodable, but never a canonical target (GIF, TIFF, BMP, ...).
    Other,
}

impl PixelFormat {
    /// Whether this stream is already in the given canonical format.
    pub fn matches(self, canonical: CanonicalFormat) -> bool {
        matches!(
            (self, canonical),
            (PixelFormat::Jpeg, CanonicalFormat::Jpeg)
                | (PixelFormat::Png, CanonicalFormat::Png)
                | (PixelFormat::WebP, CanonicalFormat::WebP)
        )
    }
}

/// Result of probing an encoded image without a full decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageProbe {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Full specification for one transcode: target dimensions plus encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeParams {
    pub width: u32,
    pub height: u32,
    pub format: CanonicalFormat,
    pub quality: u8,
}

/// Image decode/resample/encode capability.
///
/// `Sync` so conversions can fan out across rayon workers.
pub trait ImageCodec: Sync {
    /// Sniff format and dimensions. Errors on undecodable bytes.
    fn probe(&self, bytes: &[u8]) -> Result<ImageProbe, CodecError>;

    /// Decode, resample to the exact target dimensions, re-encode.
    fn transcode(&self, bytes: &[u8], params: &TranscodeParams) -> Result<Vec<u8>, CodecError>;
}

//! Pipeline configuration: defaults, optional TOML file, validation.
//!
//! Nothing in the pipeline hard-codes limits — the canonical format, the
//! dimension cap, the per-item byte cap, the page-count cap and the upload
//! batch size are all injected through [`PipelineConfig`]. The CLI loads an
//! optional `scandeck.toml` over the stock defaults; library consumers build
//! the struct directly.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The single target encoded format all pages are normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalFormat {
    Jpeg,
    Png,
    /// Lossless only with the bundled encoder; quality is ignored.
    WebP,
}

impl CanonicalFormat {
    pub fn extension(self) -> &'static str {
        match self {
            CanonicalFormat::Jpeg => "jpg",
            CanonicalFormat::Png => "png",
            CanonicalFormat::WebP => "webp",
        }
    }
}

/// Which input formats the validator lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatPolicy {
    /// Only the canonical format is accepted; nothing needs transcoding.
    CanonicalOnly,
    /// Any decodable image is accepted and handed to the transcoder.
    #[default]
    AnyDecodable,
}

/// All injected pipeline limits and knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub canonical_format: CanonicalFormat,
    /// Encode quality for lossy canonical formats (1-100).
    pub quality: u8,
    /// Pages wider than this are resampled down to it.
    pub max_dimension: u32,
    /// Hard per-item size cap in bytes.
    pub max_item_bytes: u64,
    /// Hard cap on the page collection; adds that would exceed it are
    /// refused whole.
    pub max_page_count: usize,
    /// Pages per upload request.
    pub batch_size: usize,
    /// Concurrent conversions within one transcoder batch.
    pub convert_concurrency: usize,
    pub format_policy: FormatPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canonical_format: CanonicalFormat::Jpeg,
            quality: 80,
            max_dimension: 1600,
            max_item_bytes: 10 * 1024 * 1024,
            max_page_count: 200,
            batch_size: 10,
            convert_concurrency: 5,
            format_policy: FormatPolicy::AnyDecodable,
        }
    }
}

impl PipelineConfig {
    /// Load from a TOML file, falling back to defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be at least 1".into()));
        }
        if self.convert_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "convert_concurrency must be at least 1".into(),
            ));
        }
        if self.max_page_count == 0 {
            return Err(ConfigError::Invalid(
                "max_page_count must be at least 1".into(),
            ));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(ConfigError::Invalid("quality must be within 1-100".into()));
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::Invalid("max_dimension must be positive".into()));
        }
        Ok(())
    }
}

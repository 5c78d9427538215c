//! Candidate validation: format, size and count rules.
//!
//! Validation partitions collected candidates into accepted and rejected —
//! per-item rejections never abort the add, and each rejection carries a
//! user-presentable reason. The one exception is the page-count cap: an add
//! that would push the collection past `max_page_count` is refused **whole**,
//! zero pages added, because silently truncating a chapter is worse than
//! asking the user to split it.

use crate::collect::RawCandidate;
use crate::config::{FormatPolicy, PipelineConfig};
use crate::imaging::ImageCodec;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidateError {
    #[error(
        "adding {adding} pages would exceed the limit of {max} ({existing} already present); \
         no pages were added"
    )]
    PageLimitExceeded {
        adding: usize,
        existing: usize,
        max: usize,
    },
}

/// Why one candidate was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedFormat,
    TooLarge { bytes: u64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedFormat => write!(f, "unsupported format"),
            RejectReason::TooLarge { bytes } => {
                write!(f, "too large ({})", format_size(*bytes))
            }
        }
    }
}

/// A refused candidate, kept for user-facing notices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    pub name: String,
    pub reason: RejectReason,
}

/// Partition produced by [`validate`].
#[derive(Debug, Default)]
pub struct Validation {
    pub accepted: Vec<RawCandidate>,
    pub rejected: Vec<RejectedCandidate>,
}

/// Partition `candidates` by the configured rules.
///
/// `existing_count` is the number of pages already in the store; the count
/// check applies to accepted candidates only (rejected ones don't occupy
/// slots). Input order is preserved within each partition.
pub fn validate(
    codec: &impl ImageCodec,
    candidates: Vec<RawCandidate>,
    existing_count: usize,
    config: &PipelineConfig,
) -> Result<Validation, ValidateError> {
    let mut out = Validation::default();

    for candidate in candidates {
        if candidate.bytes.len() as u64 > config.max_item_bytes {
            out.rejected.push(RejectedCandidate {
                name: candidate.name,
                reason: RejectReason::TooLarge {
                    bytes: candidate.bytes.len() as u64,
                },
            });
            continue;
        }

        let format_ok = match codec.probe(&candidate.bytes) {
            Ok(probe) => match config.format_policy {
                FormatPolicy::CanonicalOnly => probe.format.matches(config.canonical_format),
                FormatPolicy::AnyDecodable => true,
            },
            Err(_) => false,
        };
        if !format_ok {
            out.rejected.push(RejectedCandidate {
                name: candidate.name,
                reason: RejectReason::UnsupportedFormat,
            });
            continue;
        }

        out.accepted.push(candidate);
    }

    if existing_count + out.accepted.len() > config.max_page_count {
        return Err(ValidateError::PageLimitExceeded {
            adding: out.accepted.len(),
            existing: existing_count,
            max: config.max_page_count,
        });
    }

    Ok(out)
}

/// Human-readable size, e.g. `12.3 MB`.
pub fn format_size(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

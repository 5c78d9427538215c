//! Background conversion of newly added pages to the canonical format.
//!
//! Batches are serialized through a mutex in arrival order, so two rapid
//! adds never interleave their conversions; within a batch, work fans out
//! across rayon workers in groups of `convert_concurrency`.
//!
//! Conversion is best-effort by contract: a page whose bytes fail to decode
//! or re-encode keeps its original bytes and is marked
//! [`ConversionState::Degraded`] — the add never fails because of a bad
//! conversion, it just uploads the original.

use crate::config::PipelineConfig;
use crate::imaging::{ImageCodec, TranscodeParams, calculations};
use crate::store::{ConversionState, PendingFile};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Mutex;

/// Counts per outcome for one conversion batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertSummary {
    pub converted: usize,
    pub passed_through: usize,
    pub degraded: usize,
}

/// Serializes conversion batches and fans each one out with bounded
/// concurrency.
#[derive(Default)]
pub struct Transcoder {
    gate: Mutex<()>,
}

impl Transcoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert every item in place. Items are mutated to their canonical
    /// bytes (or left untouched) and their conversion state is settled.
    pub fn convert_batch(
        &self,
        codec: &impl ImageCodec,
        mut items: Vec<(&mut PendingFile, &mut ConversionState)>,
        config: &PipelineConfig,
    ) -> ConvertSummary {
        let _serial = match self.gate.lock() {
            Ok(guard) => guard,
            // A panic mid-conversion poisons the gate but leaves no shared
            // state behind; later batches can proceed.
            Err(poisoned) => poisoned.into_inner(),
        };

        for chunk in items.chunks_mut(config.convert_concurrency.max(1)) {
            chunk
                .par_iter_mut()
                .for_each(|(file, state)| **state = convert_one(codec, file, config));
        }

        let mut summary = ConvertSummary::default();
        for (_, state) in &items {
            match state {
                ConversionState::Converted => summary.converted += 1,
                ConversionState::PassedThrough => summary.passed_through += 1,
                ConversionState::Degraded => summary.degraded += 1,
                ConversionState::Pending => {}
            }
        }
        summary
    }
}

fn convert_one(
    codec: &impl ImageCodec,
    file: &mut PendingFile,
    config: &PipelineConfig,
) -> ConversionState {
    let probe = match codec.probe(&file.bytes) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!(name = %file.name, error = %e, "conversion probe failed, keeping original");
            return ConversionState::Degraded;
        }
    };

    let within_cap = probe.width <= config.max_dimension;
    if within_cap && probe.format.matches(config.canonical_format) {
        return ConversionState::PassedThrough;
    }

    let (width, height) = calculations::fit_to_width(
        (probe.width, probe.height),
        config.max_dimension,
    )
    .unwrap_or((probe.width, probe.height));

    let params = TranscodeParams {
        width,
        height,
        format: config.canonical_format,
        quality: config.quality,
    };
    match codec.transcode(&file.bytes, &params) {
        Ok(bytes) => {
            file.bytes = bytes;
            file.name = canonical_name(&file.name, config.canonical_format.extension());
            ConversionState::Converted
        }
        Err(e) => {
            tracing::warn!(name = %file.name, error = %e, "conversion failed, keeping original");
            ConversionState::Degraded
        }
    }
}

/// Swap the file extension to match the canonical encoding.
fn canonical_name(name: &str, extension: &str) -> String {
    Path::new(name)
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}

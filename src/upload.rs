//! Batch upload of pending pages: strictly sequential batches, monotonic
//! progress, cooperative cancellation.
//!
//! Batches never overlap — batch *k+1* is not issued until batch *k*'s
//! response has been consumed. That bounds outbound memory to one batch and
//! keeps progress monotone by construction. Within a batch, the resize
//! fast path fans out across rayon workers before the single multi-item
//! request is built.
//!
//! Acknowledged batches are final: cancellation and failure stop further
//! batches but never roll back assets the endpoint already created. The
//! caller owns the result map, so partial results survive an aborted save
//! and a later save links those assets instead of re-uploading.

use crate::config::PipelineConfig;
use crate::imaging::{ImageCodec, TranscodeParams, calculations};
use crate::remote::{EndpointError, RemoteStore, UploadItem};
use crate::store::PendingFile;
use crate::types::{AssetId, PageId};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// One cancellation signal per save. Cloned handles share the flag; once
/// set it stays set for the lifetime of the job.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Arc<AtomicBool>);

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sub-phase of the current batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Optimizing,
    Uploading,
}

/// Non-decreasing `completed / total`, tagged with the sub-phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

#[derive(Error, Debug)]
pub enum UploadError {
    /// The save was cancelled between batches. Distinguished from failure;
    /// no compensation is attempted.
    #[error("upload cancelled")]
    Cancelled,
    #[error("upload of pages {first}-{last} failed: {source}")]
    Batch {
        first: u32,
        last: u32,
        #[source]
        source: EndpointError,
    },
    /// The endpoint broke the positional response contract.
    #[error("endpoint returned {got} descriptors for {sent} items (pages {first}-{last})")]
    Misaligned {
        sent: usize,
        got: usize,
        first: u32,
        last: u32,
    },
}

/// A still-new page queued for upload.
#[derive(Debug)]
pub struct PendingPage<'a> {
    pub id: PageId,
    pub sequence_number: u32,
    pub file: &'a PendingFile,
}

/// Upload `pending` in consecutive batches of `batch_size`, filling
/// `results` with `page id → asset id` as each batch is acknowledged.
///
/// Pages already present in `results` (acknowledged by an earlier, aborted
/// save) are skipped rather than re-uploaded.
pub fn upload_pending(
    codec: &impl ImageCodec,
    remote: &impl RemoteStore,
    pending: &[PendingPage<'_>],
    config: &PipelineConfig,
    cancel: &CancelSignal,
    results: &mut BTreeMap<PageId, AssetId>,
    mut on_progress: impl FnMut(Progress),
) -> Result<(), UploadError> {
    let queue: Vec<&PendingPage<'_>> = pending
        .iter()
        .filter(|p| !results.contains_key(&p.id))
        .collect();
    let total = queue.len();
    let mut completed = 0usize;

    for batch in queue.chunks(config.batch_size.max(1)) {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let first = batch[0].sequence_number;
        let last = batch[batch.len() - 1].sequence_number;

        on_progress(Progress {
            phase: Phase::Optimizing,
            completed,
            total,
        });
        let items: Vec<UploadItem> = batch
            .par_iter()
            .map(|page| UploadItem {
                page_id: page.id,
                name: page.file.name.clone(),
                bytes: optimized_bytes(codec, page.file, config),
            })
            .collect();

        tracing::debug!(first, last, items = items.len(), "uploading batch");
        let descriptors = remote
            .upload_batch(&items, cancel)
            .map_err(|source| UploadError::Batch {
                first,
                last,
                source,
            })?;
        if descriptors.len() != items.len() {
            return Err(UploadError::Misaligned {
                sent: items.len(),
                got: descriptors.len(),
                first,
                last,
            });
        }

        // Positional contract: i-th descriptor belongs to the i-th item.
        for (page, descriptor) in batch.iter().zip(descriptors) {
            results.insert(page.id, descriptor.asset_id);
        }

        completed += batch.len();
        on_progress(Progress {
            phase: Phase::Uploading,
            completed,
            total,
        });
    }
    Ok(())
}

/// Last-chance resize before upload. Pages normally arrive already
/// converted, but degraded pages (and pages added under a different config)
/// can still exceed the cap. Any codec failure falls back to the original
/// bytes, same policy as conversion.
fn optimized_bytes(codec: &impl ImageCodec, file: &PendingFile, config: &PipelineConfig) -> Vec<u8> {
    let Ok(probe) = codec.probe(&file.bytes) else {
        return file.bytes.clone();
    };
    let Some((width, height)) = calculations::fit_to_width((probe.width, probe.height), config.max_dimension)
    else {
        return file.bytes.clone();
    };
    let params = TranscodeParams {
        width,
        height,
        format: config.canonical_format,
        quality: config.quality,
    };
    match codec.transcode(&file.bytes, &params) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(name = %file.name, error = %e, "pre-upload resize failed, sending original");
            file.bytes.clone()
        }
    }
}

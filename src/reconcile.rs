//! Reconciling the in-memory page sequence with the persisted manifest:
//! manifest build, snapshot capture, dirty comparison.
//!
//! The snapshot is the only basis for the dirty check. It is captured once
//! at load and replaced whole on each successful persist — never patched in
//! place, so a failed persist leaves the previous snapshot (and the dirty
//! flag) intact.

use crate::store::{Page, PageStore};
use crate::types::{AssetId, ManifestPage, PageId, ScanManifest, ScanMetadata};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A page reached manifest build without an asset id: not existing, and
    /// absent from the upload results. Contract violation, not user error.
    #[error("{id} at position {sequence_number} resolved no asset id")]
    UnresolvedPage { id: PageId, sequence_number: u32 },
}

/// Last-known-persisted state, used only for diffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub metadata: ScanMetadata,
    pub ordered_ids: Vec<PageId>,
}

impl Snapshot {
    pub fn capture(metadata: &ScanMetadata, store: &PageStore) -> Self {
        Self {
            metadata: metadata.clone(),
            ordered_ids: store.ordered_ids(),
        }
    }

}

/// Resolve every page to an asset id and assemble the persisted record.
///
/// Precondition: every new page has an entry in `results` (the uploader ran
/// to completion). An unresolved page is a programming error surfaced as
/// [`ReconcileError::UnresolvedPage`], never silently dropped.
pub fn build_manifest(
    scan_id: &str,
    metadata: &ScanMetadata,
    pages: &[Page],
    results: &BTreeMap<PageId, AssetId>,
) -> Result<ScanManifest, ReconcileError> {
    let mut out = Vec::with_capacity(pages.len());
    for page in pages {
        let asset_id = page
            .asset_id()
            .or_else(|| results.get(&page.id))
            .ok_or(ReconcileError::UnresolvedPage {
                id: page.id,
                sequence_number: page.sequence_number,
            })?;
        out.push(ManifestPage {
            sequence_number: page.sequence_number,
            asset_id: asset_id.clone(),
        });
    }
    Ok(ScanManifest {
        scan_id: scan_id.to_string(),
        metadata: metadata.clone(),
        pages: out,
    })
}

/// Whether current state diverges from the last-persisted snapshot.
///
/// True if any tracked metadata field differs, the ordered id list differs
/// in length or position, or any page is still new (unpersisted).
pub fn is_dirty(metadata: &ScanMetadata, store: &PageStore, snapshot: &Snapshot) -> bool {
    if *metadata != snapshot.metadata {
        return true;
    }
    if store.ordered_ids() != snapshot.ordered_ids {
        return true;
    }
    store.pages().iter().any(Page::is_new)
}

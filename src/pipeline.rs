//! The pipeline surface consumed by the UI layer.
//!
//! [`ScanPipeline`] wires the collector, validator, transcoder, store,
//! uploader and reconciler behind one object generic over the two capability
//! seams: the image codec and the remote store. The UI calls its methods and
//! reads [`ScanPipeline::is_dirty`]; the dirty flag is recomputed after
//! every mutation, never on demand.
//!
//! Save semantics worth spelling out:
//!
//! - Acknowledged uploads survive any abort. After a cancelled or failed
//!   save, pages whose batch was acknowledged are already flipped to
//!   existing, and the result map keeps the rest of the acknowledged ids —
//!   a retried save uploads only what is still missing.
//! - A failed persist leaves the snapshot untouched, so the pipeline stays
//!   dirty; retrying [`save`](ScanPipeline::save) then skips the upload
//!   phase entirely and only re-persists.

use crate::collect::{self, FileTree, TreeEntry};
use crate::config::PipelineConfig;
use crate::convert::{ConvertSummary, Transcoder};
use crate::imaging::ImageCodec;
use crate::reconcile::{self, ReconcileError, Snapshot};
use crate::remote::{EndpointError, RemoteStore};
use crate::store::{Page, PageContent, PageStore, PendingFile, PreviewHandle};
use crate::types::{AssetId, PageId, ScanManifest, ScanMetadata};
use crate::upload::{self, CancelSignal, PendingPage, Progress, UploadError};
use crate::validate::{self, RejectedCandidate, ValidateError};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validate(#[from] ValidateError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    /// Uploads succeeded but the manifest write failed. The uploaded asset
    /// ids are retained; retrying `save` persists without re-uploading.
    #[error("manifest persistence failed: {0}")]
    Persist(#[source] EndpointError),
    #[error("manifest fetch failed: {0}")]
    Fetch(#[source] EndpointError),
    #[error(transparent)]
    Contract(#[from] ReconcileError),
}

/// What one add operation did, for user-facing notices.
#[derive(Debug)]
pub struct AddOutcome {
    pub added: Vec<PageId>,
    pub rejected: Vec<RejectedCandidate>,
    pub conversion: ConvertSummary,
}

/// Result of [`ScanPipeline::request_close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// State was clean; everything is torn down.
    Closed,
    /// Unsaved changes exist; call
    /// [`discard_and_close`](ScanPipeline::discard_and_close) to confirm.
    NeedsConfirmation,
}

pub struct ScanPipeline<C: ImageCodec, R: RemoteStore> {
    codec: C,
    remote: R,
    config: PipelineConfig,
    scan_id: String,
    metadata: ScanMetadata,
    store: PageStore,
    transcoder: Transcoder,
    snapshot: Snapshot,
    /// page id → acknowledged asset id, across save attempts.
    results: BTreeMap<PageId, AssetId>,
    dirty: bool,
}

impl<C: ImageCodec, R: RemoteStore> ScanPipeline<C, R> {
    pub fn new(
        codec: C,
        remote: R,
        config: PipelineConfig,
        scan_id: impl Into<String>,
        metadata: ScanMetadata,
    ) -> Self {
        let snapshot = Snapshot {
            metadata: metadata.clone(),
            ordered_ids: Vec::new(),
        };
        Self {
            codec,
            remote,
            config,
            scan_id: scan_id.into(),
            metadata,
            store: PageStore::new(),
            transcoder: Transcoder::new(),
            snapshot,
            results: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Seed the store and the initial snapshot from the persisted manifest.
    /// A missing manifest means a fresh scan: empty store, clean state.
    pub fn load(&mut self) -> Result<(), PipelineError> {
        self.store.remove_all();
        self.results.clear();

        let manifest = self
            .remote
            .fetch_manifest(&self.scan_id)
            .map_err(PipelineError::Fetch)?;
        if let Some(mut manifest) = manifest {
            manifest.pages.sort_by_key(|p| p.sequence_number);
            self.metadata = manifest.metadata;
            self.store
                .add_existing_pages(manifest.pages.into_iter().map(|p| p.asset_id).collect());
        }

        self.snapshot = Snapshot::capture(&self.metadata, &self.store);
        self.recompute_dirty();
        Ok(())
    }

    // =========================================================================
    // Adding pages
    // =========================================================================

    pub fn add_from_files(
        &mut self,
        tree: &mut impl FileTree,
        files: &[PathBuf],
    ) -> Result<AddOutcome, PipelineError> {
        let candidates = collect::collect_from_files(tree, files);
        self.ingest(candidates)
    }

    pub fn add_from_directory(
        &mut self,
        tree: &mut impl FileTree,
        dir: &std::path::Path,
    ) -> Result<AddOutcome, PipelineError> {
        let candidates = collect::collect_from_directory(tree, dir);
        self.ingest(candidates)
    }

    pub fn add_from_drop(
        &mut self,
        tree: &mut impl FileTree,
        items: &[TreeEntry],
    ) -> Result<AddOutcome, PipelineError> {
        let candidates = collect::collect_from_drop(tree, items);
        self.ingest(candidates)
    }

    fn ingest(&mut self, candidates: Vec<collect::RawCandidate>) -> Result<AddOutcome, PipelineError> {
        let validation =
            validate::validate(&self.codec, candidates, self.store.len(), &self.config)?;

        let files = validation
            .accepted
            .into_iter()
            .map(|c| PendingFile {
                name: c.name,
                bytes: c.bytes,
            })
            .collect();
        let added = self.store.add_new_pages(files);

        let conversion =
            self.transcoder
                .convert_batch(&self.codec, self.store.conversion_queue(), &self.config);

        self.recompute_dirty();
        Ok(AddOutcome {
            added,
            rejected: validation.rejected,
            conversion,
        })
    }

    // =========================================================================
    // Ordering and selection (delegated, dirty recomputed)
    // =========================================================================

    pub fn move_up(&mut self, id: PageId) -> bool {
        let moved = self.store.move_up(id);
        self.recompute_dirty();
        moved
    }

    pub fn move_down(&mut self, id: PageId) -> bool {
        let moved = self.store.move_down(id);
        self.recompute_dirty();
        moved
    }

    pub fn reorder(&mut self, from: usize, to: usize) {
        self.store.reorder(from, to);
        self.recompute_dirty();
    }

    pub fn remove(&mut self, id: PageId) -> bool {
        let removed = self.store.remove(id);
        self.recompute_dirty();
        removed
    }

    pub fn remove_many(&mut self, ids: &[PageId]) -> usize {
        let removed = self.store.remove_many(ids);
        self.recompute_dirty();
        removed
    }

    pub fn remove_all(&mut self) {
        self.store.remove_all();
        self.recompute_dirty();
    }

    pub fn toggle_select(&mut self, id: PageId) {
        self.store.toggle_select(id);
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    // =========================================================================
    // Metadata and state access
    // =========================================================================

    pub fn set_metadata(&mut self, metadata: ScanMetadata) {
        self.metadata = metadata;
        self.recompute_dirty();
    }

    pub fn metadata(&self) -> &ScanMetadata {
        &self.metadata
    }

    pub fn pages(&self) -> &[Page] {
        self.store.pages()
    }

    pub fn selected_ids(&self) -> Vec<PageId> {
        self.store.selected_ids()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Install the preview factory on the underlying store.
    pub fn set_preview_factory(&mut self, factory: impl Fn(PageId) -> PreviewHandle + 'static) {
        self.store.set_preview_factory(factory);
    }

    /// Observe store mutations (the UI's re-render hook).
    pub fn subscribe(&mut self, listener: impl Fn() + 'static) {
        self.store.subscribe(listener);
    }

    // =========================================================================
    // Save and close
    // =========================================================================

    /// Upload every still-new page in sequential batches, then persist the
    /// manifest. On success the snapshot is replaced and the state is clean.
    pub fn save(
        &mut self,
        cancel: &CancelSignal,
        on_progress: impl FnMut(Progress),
    ) -> Result<ScanManifest, PipelineError> {
        let upload_result = {
            let pending: Vec<PendingPage<'_>> = self
                .store
                .pages()
                .iter()
                .filter_map(|page| match &page.content {
                    PageContent::New { file } => Some(PendingPage {
                        id: page.id,
                        sequence_number: page.sequence_number,
                        file,
                    }),
                    PageContent::Existing { .. } => None,
                })
                .collect();
            upload::upload_pending(
                &self.codec,
                &self.remote,
                &pending,
                &self.config,
                cancel,
                &mut self.results,
                on_progress,
            )
        };

        // Acknowledged batches are final either way; link them before
        // deciding how the save ends.
        self.store.mark_uploaded(&self.results);
        self.recompute_dirty();
        upload_result?;

        let manifest =
            reconcile::build_manifest(&self.scan_id, &self.metadata, self.store.pages(), &self.results)?;
        let persisted = self
            .remote
            .persist_manifest(&manifest)
            .map_err(PipelineError::Persist)?;

        self.snapshot = Snapshot::capture(&self.metadata, &self.store);
        self.results.clear();
        self.recompute_dirty();
        Ok(persisted)
    }

    /// Close if clean; ask for confirmation if dirty.
    pub fn request_close(&mut self) -> CloseOutcome {
        if self.dirty {
            return CloseOutcome::NeedsConfirmation;
        }
        self.teardown();
        CloseOutcome::Closed
    }

    /// Confirmed discard: drop unsaved state and release every preview.
    pub fn discard_and_close(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.store.remove_all();
        self.results.clear();
        self.snapshot = Snapshot::capture(&self.metadata, &self.store);
        self.recompute_dirty();
    }

    fn recompute_dirty(&mut self) {
        self.dirty = reconcile::is_dirty(&self.metadata, &self.store, &self.snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::tests::MemTree;
    use crate::imaging::codec::tests::MockCodec;
    use crate::remote::tests::MockRemote;
    use crate::store::ConversionState;
    use crate::test_helpers::fake_image;
    use crate::types::ManifestPage;
    use crate::upload::Phase;

    fn pipeline(remote: MockRemote) -> ScanPipeline<MockCodec, MockRemote> {
        ScanPipeline::new(
            MockCodec::new(),
            remote,
            PipelineConfig::default(),
            "scan-1",
            ScanMetadata {
                title: "Chapter".into(),
                chapter: Some("1".into()),
            },
        )
    }

    fn pipeline_with_config(
        remote: MockRemote,
        config: PipelineConfig,
    ) -> ScanPipeline<MockCodec, MockRemote> {
        ScanPipeline::new(
            MockCodec::new(),
            remote,
            config,
            "scan-1",
            ScanMetadata::default(),
        )
    }

    fn tree_with(names: &[&str]) -> (MemTree, Vec<PathBuf>) {
        let mut tree = MemTree::new(10);
        let mut paths = Vec::new();
        for name in names {
            let path = format!("/in/{name}");
            tree.add_file(&path, &fake_image(800, 1200, "jpg"));
            paths.push(PathBuf::from(path));
        }
        (tree, paths)
    }

    fn stored_manifest(assets: &[&str]) -> ScanManifest {
        ScanManifest {
            scan_id: "scan-1".into(),
            metadata: ScanMetadata {
                title: "Chapter".into(),
                chapter: Some("1".into()),
            },
            pages: assets
                .iter()
                .enumerate()
                .map(|(i, a)| ManifestPage {
                    sequence_number: i as u32 + 1,
                    asset_id: AssetId((*a).into()),
                })
                .collect(),
        }
    }

    fn page_names(p: &ScanPipeline<MockCodec, MockRemote>) -> Vec<String> {
        p.pages()
            .iter()
            .map(|page| match &page.content {
                PageContent::New { file } => file.name.clone(),
                PageContent::Existing { asset_id } => asset_id.0.clone(),
            })
            .collect()
    }

    // =========================================================================
    // Adding: natural order, validation, conversion
    // =========================================================================

    #[test]
    fn files_added_in_natural_order() {
        let mut tree = MemTree::new(10);
        let mut paths = Vec::new();
        for name in ["p2.webp", "p10.webp", "p1.webp", "p3.webp", "p20.webp"] {
            let path = format!("/in/{name}");
            tree.add_file(&path, &fake_image(800, 1200, "webp"));
            paths.push(PathBuf::from(path));
        }
        let mut p = pipeline(MockRemote::new());

        let outcome = p.add_from_files(&mut tree, &paths).unwrap();
        assert_eq!(outcome.added.len(), 5);
        // Conversion renames to the canonical extension; order is what matters.
        assert_eq!(
            page_names(&p),
            vec!["p1.jpg", "p2.jpg", "p3.jpg", "p10.jpg", "p20.jpg"]
        );
        assert_eq!(
            p.pages().iter().map(|p| p.sequence_number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn rejections_reported_but_add_continues() {
        let config = PipelineConfig {
            max_item_bytes: 64,
            ..PipelineConfig::default()
        };
        let mut tree = MemTree::new(10);
        tree.add_file("/in/small.jpg", &fake_image(10, 10, "jpg"));
        let mut big = fake_image(10, 10, "jpg");
        big.resize(1000, b' ');
        tree.add_file("/in/big.jpg", &big);

        let mut p = pipeline_with_config(MockRemote::new(), config);
        let outcome = p
            .add_from_files(
                &mut tree,
                &[PathBuf::from("/in/small.jpg"), PathBuf::from("/in/big.jpg")],
            )
            .unwrap();
        assert_eq!(outcome.added.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(p.pages().len(), 1);
    }

    #[test]
    fn over_count_add_refused_whole() {
        let config = PipelineConfig {
            max_page_count: 2,
            ..PipelineConfig::default()
        };
        let (mut tree, paths) = tree_with(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut p = pipeline_with_config(MockRemote::new(), config);

        assert!(matches!(
            p.add_from_files(&mut tree, &paths),
            Err(PipelineError::Validate(_))
        ));
        assert!(p.pages().is_empty());
        assert!(!p.is_dirty());
    }

    #[test]
    fn add_converts_in_background() {
        let (mut tree, paths) = tree_with(&["a.jpg"]);
        let mut p = pipeline(MockRemote::new());
        let outcome = p.add_from_files(&mut tree, &paths).unwrap();
        // Canonical format within cap: passes through.
        assert_eq!(outcome.conversion.passed_through, 1);
        assert_eq!(p.pages()[0].conversion, ConversionState::PassedThrough);
    }

    #[test]
    fn add_from_drop_dispatches_files_and_directories() {
        let mut tree = MemTree::new(2);
        tree.add_file("/d/loose.jpg", &fake_image(10, 10, "jpg"));
        tree.add_dir("/d/ch");
        tree.add_file("/d/ch/p2.jpg", &fake_image(10, 10, "jpg"));
        tree.add_file("/d/ch/p1.jpg", &fake_image(10, 10, "jpg"));

        let mut p = pipeline(MockRemote::new());
        let outcome = p
            .add_from_drop(
                &mut tree,
                &[
                    TreeEntry::File(PathBuf::from("/d/loose.jpg")),
                    TreeEntry::Dir(PathBuf::from("/d/ch")),
                ],
            )
            .unwrap();
        assert_eq!(outcome.added.len(), 3);
        assert_eq!(page_names(&p), vec!["p1.jpg", "p2.jpg", "loose.jpg"]);
    }

    // =========================================================================
    // Dirty tracking
    // =========================================================================

    #[test]
    fn load_is_clean_and_mutations_flip_dirty() {
        let remote = MockRemote::with_manifest(stored_manifest(&["a", "b", "c"]));
        let mut p = pipeline(remote);
        p.load().unwrap();
        assert!(!p.is_dirty());
        assert_eq!(p.pages().len(), 3);

        let ids: Vec<PageId> = p.pages().iter().map(|pg| pg.id).collect();
        p.move_down(ids[0]);
        assert!(p.is_dirty());

        // Moving back restores the snapshot order: clean again.
        p.move_up(ids[0]);
        assert!(!p.is_dirty());
    }

    #[test]
    fn selection_does_not_dirty() {
        let remote = MockRemote::with_manifest(stored_manifest(&["a"]));
        let mut p = pipeline(remote);
        p.load().unwrap();
        let id = p.pages()[0].id;
        p.toggle_select(id);
        p.select_all();
        assert!(!p.is_dirty());
    }

    // =========================================================================
    // Save
    // =========================================================================

    #[test]
    fn save_uploads_then_persists_and_goes_clean() {
        let (mut tree, paths) = tree_with(&["p1.jpg", "p2.jpg", "p3.jpg"]);
        let mut p = pipeline(MockRemote::new());
        p.load().unwrap();
        p.add_from_files(&mut tree, &paths).unwrap();
        assert!(p.is_dirty());

        let mut events = Vec::new();
        let manifest = p
            .save(&CancelSignal::new(), |pr| events.push(pr))
            .unwrap();

        assert_eq!(manifest.pages.len(), 3);
        assert_eq!(
            manifest.pages.iter().map(|pg| pg.sequence_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(!p.is_dirty());
        assert!(p.pages().iter().all(|pg| !pg.is_new()));
        assert!(events.iter().any(|e| e.phase == Phase::Uploading));
        assert_eq!(p.remote.persist_calls(), 1);
    }

    #[test]
    fn save_of_mixed_pages_uploads_only_new_ones() {
        let remote = MockRemote::with_manifest(stored_manifest(&["old-a"]));
        let mut p = pipeline(remote);
        p.load().unwrap();
        let (mut tree, paths) = tree_with(&["new.jpg"]);
        p.add_from_files(&mut tree, &paths).unwrap();

        let manifest = p.save(&CancelSignal::new(), |_| {}).unwrap();
        assert_eq!(p.remote.batches.borrow().len(), 1);
        assert_eq!(p.remote.batches.borrow()[0], vec!["new.jpg"]);
        assert_eq!(manifest.pages[0].asset_id, AssetId("old-a".into()));
        assert_eq!(manifest.pages[1].asset_id, AssetId("asset-1".into()));
    }

    #[test]
    fn cancel_mid_save_keeps_acknowledged_results_and_page_list() {
        let config = PipelineConfig {
            batch_size: 1,
            ..PipelineConfig::default()
        };
        let remote = MockRemote::new();
        remote.cancel_after_batch.set(Some(2));
        let (mut tree, paths) = tree_with(&["p1.jpg", "p2.jpg", "p3.jpg", "p4.jpg"]);
        let mut p = pipeline_with_config(remote, config);
        p.add_from_files(&mut tree, &paths).unwrap();

        let err = p.save(&CancelSignal::new(), |_| {}).unwrap_err();
        assert!(matches!(err, PipelineError::Upload(UploadError::Cancelled)));

        assert_eq!(p.results.len(), 2);
        assert_eq!(p.pages().len(), 4);
        assert_eq!(p.pages().iter().filter(|pg| !pg.is_new()).count(), 2);
        assert!(p.is_dirty());
        assert_eq!(p.remote.persist_calls(), 0);
    }

    #[test]
    fn retry_after_batch_failure_reuploads_only_missing_pages() {
        let config = PipelineConfig {
            batch_size: 2,
            ..PipelineConfig::default()
        };
        let remote = MockRemote::new();
        remote.fail_on_batch.set(Some(2));
        let (mut tree, paths) = tree_with(&["p1.jpg", "p2.jpg", "p3.jpg", "p4.jpg"]);
        let mut p = pipeline_with_config(remote, config);
        p.add_from_files(&mut tree, &paths).unwrap();

        let err = p.save(&CancelSignal::new(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Upload(UploadError::Batch { first: 3, last: 4, .. })
        ));

        // Second attempt: only the failed tail is uploaded, then persist.
        p.remote.fail_on_batch.set(None);
        p.save(&CancelSignal::new(), |_| {}).unwrap();
        let batches = p.remote.batches.borrow().clone();
        assert_eq!(batches, vec![vec!["p1.jpg", "p2.jpg"], vec!["p3.jpg", "p4.jpg"]]);
        assert!(!p.is_dirty());
    }

    #[test]
    fn persist_failure_retains_results_and_retry_skips_upload() {
        let remote = MockRemote::new();
        remote.fail_persists.set(1);
        let (mut tree, paths) = tree_with(&["p1.jpg", "p2.jpg"]);
        let mut p = pipeline(remote);
        p.add_from_files(&mut tree, &paths).unwrap();

        let err = p.save(&CancelSignal::new(), |_| {}).unwrap_err();
        assert!(matches!(err, PipelineError::Persist(_)));
        assert_eq!(p.results.len(), 2);
        assert!(p.is_dirty());

        // Retry: no further upload calls, persist succeeds, state clean.
        p.save(&CancelSignal::new(), |_| {}).unwrap();
        assert_eq!(p.remote.upload_calls(), 1);
        assert_eq!(p.remote.persist_calls(), 1);
        assert!(!p.is_dirty());
        assert!(p.results.is_empty());
    }

    // =========================================================================
    // Close
    // =========================================================================

    #[test]
    fn dirty_close_needs_confirmation_and_discard_restores_persisted_order() {
        let remote = MockRemote::with_manifest(stored_manifest(&["a", "b", "c"]));
        let mut p = pipeline(remote);
        p.load().unwrap();

        // Move page 3 to position 1 without adding files.
        p.reorder(2, 0);
        assert!(p.is_dirty());
        assert_eq!(p.request_close(), CloseOutcome::NeedsConfirmation);
        // Still intact: the prompt did not discard anything.
        assert_eq!(p.pages().len(), 3);

        p.discard_and_close();
        assert!(p.pages().is_empty());

        // Reopening shows the original persisted order.
        p.load().unwrap();
        assert_eq!(page_names(&p), vec!["a", "b", "c"]);
        assert!(!p.is_dirty());
    }

    #[test]
    fn clean_close_tears_down_immediately() {
        let remote = MockRemote::with_manifest(stored_manifest(&["a"]));
        let mut p = pipeline(remote);
        p.load().unwrap();
        assert_eq!(p.request_close(), CloseOutcome::Closed);
        assert!(p.pages().is_empty());
    }
}

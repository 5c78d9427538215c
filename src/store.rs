//! The ordering/selection store: the canonical in-memory page sequence.
//!
//! [`PageStore`] is the *sole* mutator of page order — nothing else splices
//! the underlying vector. Every mutation ends with a full renumber pass so
//! `sequence_number == index + 1` holds at all times, and notifies
//! subscribers so dependent state (the dirty flag, the UI) can recompute
//! immediately rather than lazily.
//!
//! Two invariants are encoded in the types rather than checked at runtime:
//!
//! - A page is *either* existing (has a remote asset id) *or* new (carries
//!   pending file bytes), never both and never neither — [`PageContent`] is
//!   an enum.
//! - A page's preview resource is released exactly once — [`PreviewHandle`]
//!   releases on drop and guards against double-release with an `Option`.
//!
//! Page ids come from a counter scoped to this store instance, reset at
//! construction. They are never reused within an instance and carry no
//! meaning outside of it.

use crate::types::{AssetId, PageId};
use std::collections::BTreeMap;
use std::fmt;

/// Bytes of a not-yet-uploaded page, plus its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Where a page's image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Already in the remote store.
    Existing { asset_id: AssetId },
    /// Added locally; uploaded on save.
    New { file: PendingFile },
}

/// Outcome of the background conversion pass for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    /// Not yet looked at (or not applicable for existing pages).
    Pending,
    /// Re-encoded to the canonical format.
    Converted,
    /// Already canonical and within the dimension cap; untouched.
    PassedThrough,
    /// Conversion failed; original bytes kept.
    Degraded,
}

/// Owner of one page's preview resource. Releases exactly once, on drop.
pub struct PreviewHandle {
    release: Option<Box<dyn FnOnce()>>,
}

impl PreviewHandle {
    /// A handle that runs `release` when the page is removed or torn down.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A handle with nothing to release (e.g. remote-URL previews).
    pub fn noop() -> Self {
        Self { release: None }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("armed", &self.release.is_some())
            .finish()
    }
}

/// One ordered image unit within a scan.
#[derive(Debug)]
pub struct Page {
    pub id: PageId,
    /// Always `index + 1`; recomputed after every structural mutation.
    pub sequence_number: u32,
    pub content: PageContent,
    pub preview: PreviewHandle,
    pub selected: bool,
    pub conversion: ConversionState,
}

impl Page {
    /// Whether this page still needs an upload.
    pub fn is_new(&self) -> bool {
        matches!(self.content, PageContent::New { .. })
    }

    pub fn asset_id(&self) -> Option<&AssetId> {
        match &self.content {
            PageContent::Existing { asset_id } => Some(asset_id),
            PageContent::New { .. } => None,
        }
    }
}

type Listener = Box<dyn Fn()>;
type PreviewFactory = Box<dyn Fn(PageId) -> PreviewHandle>;

/// The canonical ordered page sequence with selection state.
pub struct PageStore {
    pages: Vec<Page>,
    next_id: u64,
    listeners: Vec<Listener>,
    preview_factory: PreviewFactory,
}

impl Default for PageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PageStore {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            next_id: 1,
            listeners: Vec::new(),
            preview_factory: Box::new(|_| PreviewHandle::noop()),
        }
    }

    /// Install the preview-resource factory used for pages added later.
    pub fn set_preview_factory(&mut self, factory: impl Fn(PageId) -> PreviewHandle + 'static) {
        self.preview_factory = Box::new(factory);
    }

    /// Register a change listener, called after every mutation.
    pub fn subscribe(&mut self, listener: impl Fn() + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Ordered page ids, as compared against the snapshot.
    pub fn ordered_ids(&self) -> Vec<PageId> {
        self.pages.iter().map(|p| p.id).collect()
    }

    fn alloc_id(&mut self) -> PageId {
        let id = PageId(self.next_id);
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Append new (pending-upload) pages. Returns their ids in order.
    pub fn add_new_pages(&mut self, files: Vec<PendingFile>) -> Vec<PageId> {
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let id = self.alloc_id();
            let preview = (self.preview_factory)(id);
            self.pages.push(Page {
                id,
                sequence_number: 0, // set by the renumber pass below
                content: PageContent::New { file },
                preview,
                selected: false,
                conversion: ConversionState::Pending,
            });
            ids.push(id);
        }
        self.finish_mutation();
        ids
    }

    /// Append pages that already live in the remote store (manifest load).
    pub fn add_existing_pages(&mut self, asset_ids: Vec<AssetId>) -> Vec<PageId> {
        let mut ids = Vec::with_capacity(asset_ids.len());
        for asset_id in asset_ids {
            let id = self.alloc_id();
            let preview = (self.preview_factory)(id);
            self.pages.push(Page {
                id,
                sequence_number: 0,
                content: PageContent::Existing { asset_id },
                preview,
                selected: false,
                conversion: ConversionState::Pending,
            });
            ids.push(id);
        }
        self.finish_mutation();
        ids
    }

    /// Swap with the previous neighbor. No-op at the top.
    pub fn move_up(&mut self, id: PageId) -> bool {
        match self.index_of(id) {
            Some(i) if i > 0 => {
                self.pages.swap(i, i - 1);
                self.finish_mutation();
                true
            }
            _ => false,
        }
    }

    /// Swap with the next neighbor. No-op at the bottom.
    pub fn move_down(&mut self, id: PageId) -> bool {
        match self.index_of(id) {
            Some(i) if i + 1 < self.pages.len() => {
                self.pages.swap(i, i + 1);
                self.finish_mutation();
                true
            }
            _ => false,
        }
    }

    /// Remove-and-reinsert for drag reordering. Called on every intermediate
    /// hover position, so the sequence numbers track the drag live.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from >= self.pages.len() || from == to {
            return;
        }
        let page = self.pages.remove(from);
        let to = to.min(self.pages.len());
        self.pages.insert(to, page);
        self.finish_mutation();
    }

    /// Remove one page, releasing its preview. Absent id is a no-op.
    pub fn remove(&mut self, id: PageId) -> bool {
        let before = self.pages.len();
        self.pages.retain(|p| p.id != id);
        if self.pages.len() == before {
            return false;
        }
        self.finish_mutation();
        true
    }

    /// Remove several pages at once (bulk delete of a selection).
    pub fn remove_many(&mut self, ids: &[PageId]) -> usize {
        let before = self.pages.len();
        self.pages.retain(|p| !ids.contains(&p.id));
        let removed = before - self.pages.len();
        if removed > 0 {
            self.finish_mutation();
        }
        removed
    }

    /// Clear the whole collection, releasing every preview.
    pub fn remove_all(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.pages.clear();
        self.finish_mutation();
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn toggle_select(&mut self, id: PageId) {
        if let Some(i) = self.index_of(id) {
            self.pages[i].selected = !self.pages[i].selected;
            self.notify();
        }
    }

    pub fn select_all(&mut self) {
        for page in &mut self.pages {
            page.selected = true;
        }
        self.notify();
    }

    pub fn clear_selection(&mut self) {
        for page in &mut self.pages {
            page.selected = false;
        }
        self.notify();
    }

    pub fn selected_ids(&self) -> Vec<PageId> {
        self.pages
            .iter()
            .filter(|p| p.selected)
            .map(|p| p.id)
            .collect()
    }

    // =========================================================================
    // Upload bookkeeping
    // =========================================================================

    /// Flip uploaded pages from new to existing. Acknowledged uploads are
    /// never rolled back, so this is applied even after a cancelled or
    /// failed save.
    pub fn mark_uploaded(&mut self, results: &BTreeMap<PageId, AssetId>) {
        let mut changed = false;
        for page in &mut self.pages {
            if let Some(asset_id) = results.get(&page.id)
                && page.is_new()
            {
                page.content = PageContent::Existing {
                    asset_id: asset_id.clone(),
                };
                changed = true;
            }
        }
        if changed {
            self.notify();
        }
    }

    /// Mutable access to pages awaiting conversion, for the transcoder.
    pub fn conversion_queue(&mut self) -> Vec<(&mut PendingFile, &mut ConversionState)> {
        self.pages
            .iter_mut()
            .filter(|p| p.conversion == ConversionState::Pending)
            .filter_map(|p| {
                let Page {
                    content, conversion, ..
                } = p;
                match content {
                    PageContent::New { file } => Some((file, &mut *conversion)),
                    PageContent::Existing { .. } => None,
                }
            })
            .collect()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn index_of(&self, id: PageId) -> Option<usize> {
        self.pages.iter().position(|p| p.id == id)
    }

    fn finish_mutation(&mut self) {
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.sequence_number = (i + 1) as u32;
        }
        debug_assert!(
            self.pages
                .iter()
                .enumerate()
                .all(|(i, p)| p.sequence_number == (i + 1) as u32),
            "sequence numbers must equal index + 1"
        );
        self.notify();
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener();
        }
    }
}

impl fmt::Debug for PageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStore")
            .field("pages", &self.pages)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

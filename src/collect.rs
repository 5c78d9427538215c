//! Source collection: gathering page candidates from files, directories and
//! drag-and-drop payloads.
//!
//! The collector is deliberately ignorant of both the UI and the filesystem.
//! It sees the world through [`FileTree`] — the hierarchical file-source
//! capability — whose directory reads are *batched*: one call returns a
//! partial listing, and only an empty batch signals exhaustion. The collector
//! therefore loops reads until empty **before** descending into
//! subdirectories, then recurses depth-first into each one, accumulating a
//! flat candidate list.
//!
//! Enumeration order is unspecified and never trusted: entries within one
//! directory are sorted with the numeric-aware comparator from
//! [`naming`](crate::naming) ("page2" < "page10") before being appended.
//!
//! Failure policy: an unreadable entry is skipped with a warning and its
//! siblings are still traversed. Collection is never fatal as a whole, so
//! every entry point returns a plain `Vec`.

use crate::naming::natural_cmp;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A transient page candidate: produced here, consumed by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    /// Display name (the file name component).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One entry of a hierarchical source, as handed to a drop handler or
/// returned from a directory read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File(PathBuf),
    Dir(PathBuf),
}

impl TreeEntry {
    fn name(&self) -> &str {
        let path = match self {
            TreeEntry::File(p) | TreeEntry::Dir(p) => p,
        };
        path.file_name().and_then(|n| n.to_str()).unwrap_or("")
    }
}

/// Hierarchical file-source enumeration capability.
///
/// Modeled after directory readers that hand back partial listings: each
/// [`next_batch`](FileTree::next_batch) call may return only a slice of the
/// directory, and an empty batch means the listing is exhausted.
pub trait FileTree {
    /// Read the next batch of entries from `dir`. Empty = exhausted.
    fn next_batch(&mut self, dir: &Path) -> io::Result<Vec<TreeEntry>>;

    /// Read a file's contents.
    fn read_file(&mut self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Collect candidates from a flat file selection (file picker).
pub fn collect_from_files(tree: &mut impl FileTree, files: &[PathBuf]) -> Vec<RawCandidate> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort_by(|a, b| {
        natural_cmp(
            a.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            b.file_name().and_then(|n| n.to_str()).unwrap_or(""),
        )
    });

    let mut out = Vec::new();
    for path in sorted {
        push_file(tree, path, &mut out);
    }
    out
}

/// Collect candidates from a directory selection, recursing depth-first.
pub fn collect_from_directory(tree: &mut impl FileTree, dir: &Path) -> Vec<RawCandidate> {
    let mut out = Vec::new();
    descend(tree, dir, &mut out);
    out
}

/// Collect candidates from a drag-and-drop payload: flat files and whole
/// directories mixed, dispatched per entry.
pub fn collect_from_drop(tree: &mut impl FileTree, items: &[TreeEntry]) -> Vec<RawCandidate> {
    let mut sorted: Vec<&TreeEntry> = items.iter().collect();
    sorted.sort_by(|a, b| natural_cmp(a.name(), b.name()));

    let mut out = Vec::new();
    for item in sorted {
        match item {
            TreeEntry::File(path) => push_file(tree, path, &mut out),
            TreeEntry::Dir(path) => descend(tree, path, &mut out),
        }
    }
    out
}

/// Drain a directory's batched listing completely, then recurse.
fn descend(tree: &mut impl FileTree, dir: &Path, out: &mut Vec<RawCandidate>) {
    // Exhaust this directory's reader before touching any subdirectory.
    let mut entries = Vec::new();
    loop {
        match tree.next_batch(dir) {
            Ok(batch) if batch.is_empty() => break,
            Ok(batch) => entries.extend(batch),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                return;
            }
        }
    }

    entries.sort_by(|a, b| natural_cmp(a.name(), b.name()));

    for entry in entries {
        match entry {
            TreeEntry::File(path) => push_file(tree, &path, out),
            TreeEntry::Dir(path) => descend(tree, &path, out),
        }
    }
}

fn push_file(tree: &mut impl FileTree, path: &Path, out: &mut Vec<RawCandidate>) {
    match tree.read_file(path) {
        Ok(bytes) => out.push(RawCandidate {
            name: path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string(),
            bytes,
        }),
        Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable file"),
    }
}

/// Default batch size for [`FsTree`] directory reads.
const FS_BATCH: usize = 64;

/// Filesystem-backed [`FileTree`].
///
/// Listings are materialized on the first `next_batch` call for a directory
/// and drained in fixed-size batches; once exhausted the cursor is dropped so
/// a later traversal re-enumerates from scratch.
pub struct FsTree {
    batch: usize,
    cursors: HashMap<PathBuf, VecDeque<TreeEntry>>,
}

impl FsTree {
    pub fn new() -> Self {
        Self::with_batch_size(FS_BATCH)
    }

    pub fn with_batch_size(batch: usize) -> Self {
        Self {
            batch: batch.max(1),
            cursors: HashMap::new(),
        }
    }
}

impl Default for FsTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree for FsTree {
    fn next_batch(&mut self, dir: &Path) -> io::Result<Vec<TreeEntry>> {
        let queue = match self.cursors.entry(dir.to_path_buf()) {
            std::collections::hash_map::Entry::Occupied(cursor) => cursor.into_mut(),
            std::collections::hash_map::Entry::Vacant(slot) => {
                let mut entries = VecDeque::new();
                for entry in std::fs::read_dir(dir)? {
                    let entry = entry?;
                    let path = entry.path();
                    let name = entry.file_name();
                    // Hidden files never become pages
                    if name.to_string_lossy().starts_with('.') {
                        continue;
                    }
                    let file_type = entry.file_type()?;
                    if file_type.is_dir() {
                        entries.push_back(TreeEntry::Dir(path));
                    } else if file_type.is_file() {
                        entries.push_back(TreeEntry::File(path));
                    }
                }
                slot.insert(entries)
            }
        };
        let take = self.batch.min(queue.len());
        let batch: Vec<TreeEntry> = queue.drain(..take).collect();
        if batch.is_empty() {
            self.cursors.remove(dir);
        }
        Ok(batch)
    }

    fn read_file(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

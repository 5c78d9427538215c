//! Shared types serialized between the pipeline and the remote store.
//!
//! Everything here is plain data. `PageId` identifies a page within one
//! pipeline instance only; `AssetId` is the remote store's opaque identity
//! for an uploaded binary. The persisted unit is [`ScanManifest`]: the
//! ordered `(sequence_number, asset_id)` list plus the scan's metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a page within one pipeline instance.
///
/// Allocated from a counter scoped to the owning store — never global, never
/// reused within an instance, meaningless outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

/// Opaque identity of an asset in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub String);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata fields tracked for dirty-comparison alongside page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

/// One entry of the persisted page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPage {
    pub sequence_number: u32,
    pub asset_id: AssetId,
}

/// The persisted record for one scan: metadata plus the ordered page list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanManifest {
    pub scan_id: String,
    pub metadata: ScanMetadata,
    pub pages: Vec<ManifestPage>,
}

//! The remote-store seam: asset upload, manifest persistence, manifest fetch.
//!
//! The pipeline owns neither endpoint; it talks to them through
//! [`RemoteStore`]. The response to an upload is **positional**: the i-th
//! descriptor identifies the asset created from the i-th submitted item, and
//! the uploader treats any misalignment as a batch failure. The production
//! implementation shipped with this crate is the directory-backed
//! [`FsRemote`](crate::fs_remote::FsRemote); tests use [`tests::MockRemote`].

use crate::types::{AssetId, PageId, ScanManifest};
use crate::upload::CancelSignal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The endpoint refused the request (non-2xx equivalent).
    #[error("endpoint rejected request: {0}")]
    Rejected(String),
}

/// One item of a multi-item upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub page_id: PageId,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One created asset, as reported by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetDescriptor {
    pub asset_id: AssetId,
    pub byte_len: u64,
}

/// Asset upload + manifest persistence + manifest fetch.
pub trait RemoteStore {
    /// Upload one batch. The returned descriptors are in submission order,
    /// one per item. `cancel` lets an implementation abort an in-flight
    /// request; a cancelled request surfaces as `Rejected`.
    fn upload_batch(
        &self,
        items: &[UploadItem],
        cancel: &CancelSignal,
    ) -> Result<Vec<AssetDescriptor>, EndpointError>;

    /// Persist the manifest in one call; echoes the persisted record.
    fn persist_manifest(&self, manifest: &ScanManifest) -> Result<ScanManifest, EndpointError>;

    /// Fetch the current persisted manifest, if any.
    fn fetch_manifest(&self, scan_id: &str) -> Result<Option<ScanManifest>, EndpointError>;
}

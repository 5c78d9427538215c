//! Directory-backed [`RemoteStore`]: assets are stored content-addressed
//! under `assets/`, manifests as pretty JSON under `manifests/`.
//!
//! This is the crate's offline target — the CLI runs the whole pipeline
//! against it without a server. Asset identity is the SHA-256 of the bytes,
//! so re-uploading identical content is naturally idempotent.

use crate::remote::{AssetDescriptor, EndpointError, RemoteStore, UploadItem};
use crate::types::{AssetId, ScanManifest};
use crate::upload::CancelSignal;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FsRemote {
    assets_dir: PathBuf,
    manifests_dir: PathBuf,
}

impl FsRemote {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self, EndpointError> {
        let assets_dir = root.join("assets");
        let manifests_dir = root.join("manifests");
        fs::create_dir_all(&assets_dir)?;
        fs::create_dir_all(&manifests_dir)?;
        Ok(Self {
            assets_dir,
            manifests_dir,
        })
    }

    fn asset_path(&self, id: &AssetId, name: &str) -> PathBuf {
        match Path::new(name).extension().and_then(|e| e.to_str()) {
            Some(ext) => self.assets_dir.join(format!("{id}.{ext}")),
            None => self.assets_dir.join(&id.0),
        }
    }

    fn manifest_path(&self, scan_id: &str) -> PathBuf {
        self.manifests_dir.join(format!("{scan_id}.json"))
    }
}

/// Content address: hex SHA-256 of the bytes.
fn content_id(bytes: &[u8]) -> AssetId {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    AssetId(format!("{:x}", hasher.finalize()))
}

impl RemoteStore for FsRemote {
    fn upload_batch(
        &self,
        items: &[UploadItem],
        cancel: &CancelSignal,
    ) -> Result<Vec<AssetDescriptor>, EndpointError> {
        let mut descriptors = Vec::with_capacity(items.len());
        for item in items {
            if cancel.is_cancelled() {
                return Err(EndpointError::Rejected("upload aborted".into()));
            }
            let asset_id = content_id(&item.bytes);
            let path = self.asset_path(&asset_id, &item.name);
            if !path.exists() {
                fs::write(&path, &item.bytes)?;
            }
            tracing::debug!(asset = %asset_id, path = %path.display(), "stored asset");
            descriptors.push(AssetDescriptor {
                asset_id,
                byte_len: item.bytes.len() as u64,
            });
        }
        Ok(descriptors)
    }

    fn persist_manifest(&self, manifest: &ScanManifest) -> Result<ScanManifest, EndpointError> {
        let json = serde_json::to_string_pretty(manifest)?;
        fs::write(self.manifest_path(&manifest.scan_id), json)?;
        Ok(manifest.clone())
    }

    fn fetch_manifest(&self, scan_id: &str) -> Result<Option<ScanManifest>, EndpointError> {
        let path = self.manifest_path(scan_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ManifestPage, PageId, ScanMetadata};
    use tempfile::tempdir;

    fn item(name: &str, bytes: &[u8]) -> UploadItem {
        UploadItem {
            page_id: PageId(1),
            name: name.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn upload_is_content_addressed_and_idempotent() {
        let dir = tempdir().unwrap();
        let remote = FsRemote::open(dir.path()).unwrap();
        let cancel = CancelSignal::new();

        let first = remote
            .upload_batch(&[item("p1.jpg", b"same bytes")], &cancel)
            .unwrap();
        let second = remote
            .upload_batch(&[item("other-name.jpg", b"same bytes")], &cancel)
            .unwrap();
        assert_eq!(first[0].asset_id, second[0].asset_id);

        let stored: Vec<_> = fs::read_dir(dir.path().join("assets"))
            .unwrap()
            .collect();
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn descriptors_align_with_submission_order() {
        let dir = tempdir().unwrap();
        let remote = FsRemote::open(dir.path()).unwrap();
        let got = remote
            .upload_batch(
                &[item("a.jpg", b"aaa"), item("b.jpg", b"bbb")],
                &CancelSignal::new(),
            )
            .unwrap();
        assert_eq!(got.len(), 2);
        assert_ne!(got[0].asset_id, got[1].asset_id);
        assert_eq!(got[0].byte_len, 3);
    }

    #[test]
    fn manifest_roundtrips_through_disk() {
        let dir = tempdir().unwrap();
        let remote = FsRemote::open(dir.path()).unwrap();
        let manifest = ScanManifest {
            scan_id: "vol1-ch3".into(),
            metadata: ScanMetadata {
                title: "Volume 1".into(),
                chapter: Some("3".into()),
            },
            pages: vec![ManifestPage {
                sequence_number: 1,
                asset_id: AssetId("abc".into()),
            }],
        };

        remote.persist_manifest(&manifest).unwrap();
        let fetched = remote.fetch_manifest("vol1-ch3").unwrap();
        assert_eq!(fetched, Some(manifest));
    }

    #[test]
    fn missing_manifest_fetches_none() {
        let dir = tempdir().unwrap();
        let remote = FsRemote::open(dir.path()).unwrap();
        assert_eq!(remote.fetch_manifest("nope").unwrap(), None);
    }

    #[test]
    fn cancelled_signal_aborts_batch() {
        let dir = tempdir().unwrap();
        let remote = FsRemote::open(dir.path()).unwrap();
        let cancel = CancelSignal::new();
        cancel.cancel();
        assert!(remote
            .upload_batch(&[item("p.jpg", b"x")], &cancel)
            .is_err());
    }
}

//! # Scandeck
//!
//! The scan page ingestion pipeline for a management console of serialized
//! illustrated content: paginated image sets ("scans") attached to a work.
//! It collects page images from heterogeneous sources, validates and
//! transcodes them to a canonical format, keeps a strict page ordering under
//! interactive mutation, uploads new pages in bounded sequential batches,
//! and reconciles everything into one persisted manifest while tracking
//! unsaved-change state.
//!
//! # Architecture: One Flow, Two Seams
//!
//! ```text
//! collect → validate → store (+ background convert)
//!   → [reorder / select / delete] → upload (on save) → reconcile → persist
//! ```
//!
//! Everything environment-specific sits behind two capability traits:
//!
//! - [`imaging::ImageCodec`] — decode/resample/encode. Production
//!   implementation is the `image`-crate [`imaging::RustCodec`].
//! - [`collect::FileTree`] — hierarchical file-source enumeration with
//!   batched directory reads. Production implementation is
//!   [`collect::FsTree`].
//!
//! The remote side is a third seam, [`remote::RemoteStore`], covering asset
//! upload and manifest persistence; [`fs_remote::FsRemote`] implements it
//! against a local directory so the CLI can run the whole pipeline offline.
//!
//! This separation exists so the pipeline logic — ordering invariants, batch
//! sequencing, cancellation, dirty tracking — is exercised by fast unit
//! tests with mock implementations, while the production codec and walker
//! get their own focused tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`collect`] | Source collection from files, directories, drag-and-drop; `FileTree` seam |
//! | [`validate`] | Format / size / count rules; atomic page-count refusal |
//! | [`imaging`] | Codec seam, pure dimension math, `image`-crate implementation |
//! | [`convert`] | FIFO-serialized, bounded-concurrency canonical conversion |
//! | [`store`] | Ordered page sequence: renumbering, selection, preview ownership |
//! | [`upload`] | Strictly sequential batch upload, progress, cancellation |
//! | [`remote`] | `RemoteStore` seam and wire types |
//! | [`fs_remote`] | Directory-backed remote store (content-addressed assets) |
//! | [`reconcile`] | Manifest build, snapshot, dirty comparison |
//! | [`pipeline`] | `ScanPipeline` — the surface the UI (and CLI) consume |
//! | [`config`] | Injected limits and knobs, optional `scandeck.toml` |
//! | [`types`] | Shared serialized types (`ScanManifest`, ids) |
//! | [`naming`] | Numeric-aware natural filename comparator |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Sequence numbers are derived, never stored truth
//!
//! `Page.sequence_number` always equals its index plus one; every store
//! mutation ends with a full renumber pass. The alternative — patching
//! numbers incrementally — is where ordering bugs live.
//!
//! ## Acknowledged uploads are final
//!
//! Cancelling or failing a save never rolls back batches the endpoint
//! already acknowledged. The result map survives in memory, so a retried
//! save links those assets instead of re-uploading them. Orphaned remote
//! assets from an abandoned session are accepted as a known cost.
//!
//! ## JPEG as the stock canonical format
//!
//! The bundled WebP encoder is lossless-only, so the documented
//! fixed-quality semantics hold for JPEG; the canonical format stays a
//! config knob.

pub mod collect;
pub mod config;
pub mod convert;
pub mod fs_remote;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod store;
pub mod types;
pub mod upload;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;

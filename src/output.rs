//! CLI output formatting.
//!
//! Each concern has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.
//!
//! ```text
//! Added 5 pages (3 converted, 2 passed through)
//!     rejected: notes.txt — unsupported format
//!     rejected: huge.jpg — too large (12.3 MB)
//!
//! scan vol1-ch3 — Volume 1 (5 pages)
//!     001 9f2c41aa…
//!     002 0b77d3c2…
//! ```

use crate::pipeline::AddOutcome;
use crate::types::ScanManifest;
use crate::upload::{Phase, Progress};
use crate::validate::RejectedCandidate;

/// Summary of one add operation: counts plus per-item rejection notices.
pub fn format_add_summary(outcome: &AddOutcome) -> Vec<String> {
    let c = outcome.conversion;
    let mut detail = Vec::new();
    if c.converted > 0 {
        detail.push(format!("{} converted", c.converted));
    }
    if c.passed_through > 0 {
        detail.push(format!("{} passed through", c.passed_through));
    }
    if c.degraded > 0 {
        detail.push(format!("{} kept original", c.degraded));
    }

    let mut lines = Vec::new();
    let pages = if outcome.added.len() == 1 { "page" } else { "pages" };
    let header = if detail.is_empty() {
        format!("Added {} {pages}", outcome.added.len())
    } else {
        format!("Added {} {pages} ({})", outcome.added.len(), detail.join(", "))
    };
    lines.push(header);
    lines.extend(format_rejections(&outcome.rejected));
    lines
}

/// One indented notice per rejected candidate.
pub fn format_rejections(rejected: &[RejectedCandidate]) -> Vec<String> {
    rejected
        .iter()
        .map(|r| format!("    rejected: {} — {}", r.name, r.reason))
        .collect()
}

/// Persisted-manifest inventory: header plus one line per page.
pub fn format_manifest(manifest: &ScanManifest) -> Vec<String> {
    let pages = if manifest.pages.len() == 1 { "page" } else { "pages" };
    let mut lines = vec![format!(
        "scan {} — {} ({} {pages})",
        manifest.scan_id,
        manifest.metadata.title,
        manifest.pages.len()
    )];
    for page in &manifest.pages {
        lines.push(format!(
            "    {:03} {}",
            page.sequence_number,
            short_asset(&page.asset_id.0)
        ));
    }
    lines
}

/// One progress line, e.g. `[uploading] 3/10`.
pub fn format_progress(progress: Progress) -> String {
    let phase = match progress.phase {
        Phase::Optimizing => "optimizing",
        Phase::Uploading => "uploading",
    };
    format!("[{phase}] {}/{}", progress.completed, progress.total)
}

fn short_asset(id: &str) -> String {
    if id.len() > 12 {
        format!("{}…", &id[..12])
    } else {
        id.to_string()
    }
}

pub fn print_add_summary(outcome: &AddOutcome) {
    for line in format_add_summary(outcome) {
        println!("{line}");
    }
}

pub fn print_manifest(manifest: &ScanManifest) {
    for line in format_manifest(manifest) {
        println!("{line}");
    }
}

pub fn print_progress(progress: Progress) {
    println!("{}", format_progress(progress));
}

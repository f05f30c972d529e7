//! trigger — resolve a submitted path and run one hole scan over it.
//!
//! Pipeline: validate the path string, resolve it (following symlinks),
//! open the object read-only, derive the extent size and probe window,
//! map the file and scan. Every acquired resource (open handle, mapping)
//! is scoped to the call and released on all exit paths.
//!
//! Failures are a closed taxonomy so callers can tell bad input from a
//! missing object from an object that exists but cannot be scanned. The
//! scanner itself cannot fail; once inputs are validated a report always
//! comes back.

use std::fs::{self, File};
use std::io;
use std::os::unix::fs::MetadataExt;

use log::debug;
use thiserror::Error;

use crate::config::ScanConfig;
use crate::consts::MAX_PATH_LEN;
use crate::metrics::{record_scan, record_scan_failure};
use crate::ra;
use crate::residency::FileResidency;
use crate::scanner::{scan_hole, HoleReport};
use crate::util::{ceil_div, system_page_size};

/// Why a scan request was refused. One variant per distinct condition;
/// never merged into a generic failure.
#[derive(Debug, Error)]
pub enum TriggerError {
    /// The submitted path exceeds the fixed input bound.
    #[error("path too long: {len} bytes (limit {limit})")]
    PathTooLong { len: usize, limit: usize },

    /// Nothing left after stripping the newline.
    #[error("empty path")]
    EmptyPath,

    /// The path does not resolve to an object (absent, denied, malformed).
    #[error("path resolution failed: {0}")]
    PathResolutionFailed(#[source] io::Error),

    /// The object resolved but cannot be opened or mapped for scanning.
    #[error("open failed: {0}")]
    OpenFailed(#[source] io::Error),

    /// The object has no pages to scan.
    #[error("object is empty (zero pages)")]
    EmptyObject,
}

impl TriggerError {
    /// Stable short code for wire responses and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            TriggerError::PathTooLong { .. } => "path-too-long",
            TriggerError::EmptyPath => "empty-path",
            TriggerError::PathResolutionFailed(_) => "path-resolution-failed",
            TriggerError::OpenFailed(_) => "open-failed",
            TriggerError::EmptyObject => "empty-object",
        }
    }
}

/// Scan the hole around the configured target index in the file at `path`.
///
/// `path` is the raw submitted string, already newline-stripped by the
/// transport. Validation happens before any filesystem access.
pub fn run_scan(path: &str, cfg: &ScanConfig) -> Result<HoleReport, TriggerError> {
    let res = run_scan_inner(path, cfg);
    if res.is_err() {
        record_scan_failure();
    }
    res
}

fn run_scan_inner(path: &str, cfg: &ScanConfig) -> Result<HoleReport, TriggerError> {
    // Input bounds first; an over-long or empty path performs no
    // filesystem work at all.
    if path.len() > MAX_PATH_LEN - 1 {
        return Err(TriggerError::PathTooLong {
            len: path.len(),
            limit: MAX_PATH_LEN - 1,
        });
    }
    if path.is_empty() {
        return Err(TriggerError::EmptyPath);
    }

    // Resolve, following symlinks.
    let resolved = fs::canonicalize(path).map_err(TriggerError::PathResolutionFailed)?;

    // Open read-only.
    let file = File::open(&resolved).map_err(TriggerError::OpenFailed)?;
    let meta = file.metadata().map_err(TriggerError::OpenFailed)?;

    // Extent size in cache pages, from the current object size.
    let page_size = cfg.page_size.unwrap_or_else(system_page_size);
    let total_pages = ceil_div(meta.len(), page_size as u64);
    if total_pages == 0 {
        return Err(TriggerError::EmptyObject);
    }

    // Window: explicit override wins, else the backing device's readahead.
    let window = cfg
        .window_pages
        .unwrap_or_else(|| ra::window_pages(meta.dev(), page_size));

    // Residency accessor over the open handle. Mapping a non-regular
    // object (a directory fd, say) fails here.
    let index = FileResidency::map(&file, page_size).map_err(TriggerError::OpenFailed)?;

    debug!(
        "scanning {} (target={} extent={} pages, window={} pages)",
        resolved.display(),
        cfg.target_index,
        total_pages,
        window
    );

    let report = scan_hole(&index, cfg.target_index, total_pages, window);
    record_scan(report.elapsed_ns, report.missing_pages);
    Ok(report)
}

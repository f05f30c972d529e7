use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use pagehole::config::ScanConfig;
use pagehole::trigger::{run_scan, TriggerError};
use pagehole::util::{ceil_div, system_page_size};

#[test]
fn empty_path_is_rejected_before_any_io() {
    let cfg = ScanConfig::default();
    let err = run_scan("", &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::EmptyPath));
    assert_eq!(err.kind(), "empty-path");
}

#[test]
fn overlong_path_is_rejected_before_resolution() {
    let cfg = ScanConfig::default();
    // 256 path bytes: one past the 255 limit.
    let path = "a".repeat(256);
    let err = run_scan(&path, &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::PathTooLong { len: 256, .. }));

    // 255 bytes is within bounds; this one just doesn't resolve.
    let path = "a".repeat(255);
    let err = run_scan(&path, &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::PathResolutionFailed(_)));
}

#[test]
fn missing_object_fails_resolution() {
    let cfg = ScanConfig::default();
    let path = unique_root("missing").join("no-such-file");
    let err = run_scan(&path.to_string_lossy(), &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::PathResolutionFailed(_)));
    assert_eq!(err.kind(), "path-resolution-failed");
}

#[test]
fn directory_resolves_but_cannot_be_scanned() -> Result<()> {
    let root = unique_root("dir");
    fs::create_dir_all(&root)?;
    let cfg = ScanConfig::default();
    let err = run_scan(&root.to_string_lossy(), &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::OpenFailed(_)));
    assert_eq!(err.kind(), "open-failed");
    Ok(())
}

#[test]
fn zero_byte_object_is_an_explicit_error() -> Result<()> {
    let root = unique_root("empty");
    fs::create_dir_all(&root)?;
    let path = root.join("empty.dat");
    fs::write(&path, b"")?;

    let cfg = ScanConfig::default();
    let err = run_scan(&path.to_string_lossy(), &cfg).unwrap_err();
    assert!(matches!(err, TriggerError::EmptyObject));
    Ok(())
}

#[test]
fn scan_of_a_real_file_reports_within_bounds() -> Result<()> {
    let root = unique_root("scan");
    fs::create_dir_all(&root)?;
    let path = root.join("data.bin");

    // ~37 pages of patterned data (not page-aligned on purpose).
    let page_size = system_page_size();
    let len = 36 * page_size + page_size / 2;
    fs::write(&path, build_pattern(len, 0x5A))?;

    let before = pagehole::metrics::snapshot();

    let cfg = ScanConfig::default()
        .with_target_index(16)
        .with_window_pages(Some(8));
    let report = run_scan(&path.to_string_lossy(), &cfg)?;

    let total = ceil_div(len as u64, page_size as u64);
    assert_eq!(report.total_pages, total);
    assert_eq!(report.window_pages, 8);
    assert_eq!(report.target, 16);
    assert!(report.left_boundary <= 16);
    assert!(16 <= report.right_boundary);
    assert!(report.right_boundary < total);
    assert!(report.missing_pages >= 1);

    let (lo, hi) = report.hole_range();
    assert!(lo <= hi + 1, "tightened range may be empty but not inverted");

    let after = pagehole::metrics::snapshot();
    assert!(after.scans_total >= before.scans_total + 1);
    assert!(after.probe_steps_total > before.probe_steps_total);
    Ok(())
}

#[test]
fn symlinks_are_followed() -> Result<()> {
    let root = unique_root("symlink");
    fs::create_dir_all(&root)?;
    let target = root.join("real.dat");
    let page_size = system_page_size();
    fs::write(&target, build_pattern(4 * page_size, 0xC3))?;

    let link = root.join("alias");
    std::os::unix::fs::symlink(&target, &link)?;

    let cfg = ScanConfig::default()
        .with_target_index(1)
        .with_window_pages(Some(4));
    let report = run_scan(&link.to_string_lossy(), &cfg)?;
    assert_eq!(report.total_pages, 4);
    Ok(())
}

#[test]
fn target_past_extent_still_reports_clamped_boundaries() -> Result<()> {
    // The target index is configuration, so it can point past a small
    // file; boundaries still land inside the extent.
    let root = unique_root("small");
    fs::create_dir_all(&root)?;
    let path = root.join("tiny.dat");
    let page_size = system_page_size();
    fs::write(&path, build_pattern(2 * page_size, 0x11))?;

    let cfg = ScanConfig::default()
        .with_target_index(16)
        .with_window_pages(Some(8));
    let report = run_scan(&path.to_string_lossy(), &cfg)?;
    assert_eq!(report.total_pages, 2);
    assert!(report.right_boundary < 2);
    Ok(())
}

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("pagehole-{}-{}-{}", prefix, pid, t))
}

fn build_pattern(len: usize, byte: u8) -> Vec<u8> {
    let mut v = vec![byte; len];
    if len >= 8 {
        v[len / 2] = byte ^ 0x11;
        v[len - 1] = byte;
    }
    v
}

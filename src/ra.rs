//! ra — per-object probe window from the backing device's readahead.
//!
//! The window bound of a scan is an object-specific property: the readahead
//! depth configured for the device backing the scanned file, read from
//! /sys/class/bdi/<major>:<minor>/read_ahead_kb. When sysfs is unavailable
//! or unparsable the kernel's default readahead (128 KiB) is assumed.

use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::consts::DEFAULT_READAHEAD_BYTES;
use crate::util::{ceil_div, dev_major, dev_minor};

/// Probe window in pages for an object backed by device `dev`.
/// Never returns 0 (a zero readahead setting still yields a 1-page window).
pub fn window_pages(dev: u64, page_size: usize) -> u64 {
    let bytes = match device_readahead_bytes(dev) {
        Some(b) => b,
        None => {
            debug!(
                "no readahead hint for dev {}:{}; assuming {} bytes",
                dev_major(dev),
                dev_minor(dev),
                DEFAULT_READAHEAD_BYTES
            );
            DEFAULT_READAHEAD_BYTES
        }
    };
    ceil_div(bytes, page_size as u64).max(1)
}

fn device_readahead_bytes(dev: u64) -> Option<u64> {
    let text = fs::read_to_string(bdi_readahead_path(dev)).ok()?;
    parse_readahead_kb(&text).map(|kb| kb * 1024)
}

fn bdi_readahead_path(dev: u64) -> PathBuf {
    PathBuf::from(format!(
        "/sys/class/bdi/{}:{}/read_ahead_kb",
        dev_major(dev),
        dev_minor(dev)
    ))
}

fn parse_readahead_kb(s: &str) -> Option<u64> {
    s.trim().parse::<u64>().ok()
}

//! Lightweight global metrics for pagehole.
//!
//! Thread-safe atomic counters for the subsystems:
//! - Scans (count, failures, accumulated latency, missing pages found)
//! - Probes (steps taken, resident hits)
//! - Control interface (requests, rejects)

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Scans -----
static SCANS_TOTAL: AtomicU64 = AtomicU64::new(0);
static SCAN_FAILURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static SCAN_NANOS_TOTAL: AtomicU64 = AtomicU64::new(0);
static HOLE_PAGES_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- Probes -----
static PROBE_STEPS_TOTAL: AtomicU64 = AtomicU64::new(0);
static PROBE_HITS_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- Control interface -----
static CTL_REQUESTS_TOTAL: AtomicU64 = AtomicU64::new(0);
static CTL_REJECTS_TOTAL: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub scans_total: u64,
    pub scan_failures_total: u64,
    pub scan_nanos_total: u64,
    pub hole_pages_total: u64,

    pub probe_steps_total: u64,
    pub probe_hits_total: u64,

    pub ctl_requests_total: u64,
    pub ctl_rejects_total: u64,
}

impl MetricsSnapshot {
    /// Mean probe duration per completed scan, in nanoseconds.
    pub fn avg_scan_nanos(&self) -> f64 {
        if self.scans_total == 0 {
            0.0
        } else {
            self.scan_nanos_total as f64 / self.scans_total as f64
        }
    }

    /// Share of probe steps that landed on a resident page.
    pub fn probe_hit_ratio(&self) -> f64 {
        if self.probe_steps_total == 0 {
            0.0
        } else {
            self.probe_hits_total as f64 / self.probe_steps_total as f64
        }
    }
}

// ----- Recorders (scans) -----
pub fn record_scan(elapsed_ns: u64, missing_pages: u64) {
    SCANS_TOTAL.fetch_add(1, Ordering::Relaxed);
    SCAN_NANOS_TOTAL.fetch_add(elapsed_ns, Ordering::Relaxed);
    HOLE_PAGES_TOTAL.fetch_add(missing_pages, Ordering::Relaxed);
}

pub fn record_scan_failure() {
    SCAN_FAILURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (probes) -----
pub fn record_probe_step() {
    PROBE_STEPS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_probe_hit() {
    PROBE_HITS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (control interface) -----
pub fn record_ctl_request() {
    CTL_REQUESTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_ctl_reject() {
    CTL_REJECTS_TOTAL.fetch_add(1, Ordering::Relaxed);
}

/// Consistent-enough snapshot of all counters (individually atomic reads).
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        scans_total: SCANS_TOTAL.load(Ordering::Relaxed),
        scan_failures_total: SCAN_FAILURES_TOTAL.load(Ordering::Relaxed),
        scan_nanos_total: SCAN_NANOS_TOTAL.load(Ordering::Relaxed),
        hole_pages_total: HOLE_PAGES_TOTAL.load(Ordering::Relaxed),
        probe_steps_total: PROBE_STEPS_TOTAL.load(Ordering::Relaxed),
        probe_hits_total: PROBE_HITS_TOTAL.load(Ordering::Relaxed),
        ctl_requests_total: CTL_REQUESTS_TOTAL.load(Ordering::Relaxed),
        ctl_rejects_total: CTL_REJECTS_TOTAL.load(Ordering::Relaxed),
    }
}

/// Zero every counter. Intended for tests.
pub fn reset() {
    SCANS_TOTAL.store(0, Ordering::Relaxed);
    SCAN_FAILURES_TOTAL.store(0, Ordering::Relaxed);
    SCAN_NANOS_TOTAL.store(0, Ordering::Relaxed);
    HOLE_PAGES_TOTAL.store(0, Ordering::Relaxed);
    PROBE_STEPS_TOTAL.store(0, Ordering::Relaxed);
    PROBE_HITS_TOTAL.store(0, Ordering::Relaxed);
    CTL_REQUESTS_TOTAL.store(0, Ordering::Relaxed);
    CTL_REJECTS_TOTAL.store(0, Ordering::Relaxed);
}

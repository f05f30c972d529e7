//! scanner — bounded bidirectional hole probe around a target page.
//!
//! Given a residency accessor, a target index, the extent size in pages and
//! a window bound, walk left and right from the target until a resident
//! page, the extent edge or the window budget stops each probe, and report
//! how far the absence extends.
//!
//! Semantics:
//! - Both probes have do-while shape: the first step is always taken and
//!   counted, even when the target sits at an extent edge and the step
//!   lands outside the valid index range (such a query answers OutOfRange
//!   and counts as a miss).
//! - Budgets are asymmetric: the left probe may take up to window/2 steps,
//!   the right probe up to window/2 - 1. Kept as-is so reported numbers stay
//!   comparable across versions; see DESIGN.md.
//! - missing_pages starts at 1 (the target itself) and grows by one per
//!   non-hit step; the step that finds a resident page does not count.
//! - Reported boundaries are the raw probe stop positions clamped into
//!   [0, total_pages - 1]; hit flags let the consumer tighten the range to
//!   the true hole edges without re-probing.
//!
//! The scanner has no failure mode: given an accessor and total_pages >= 1
//! it always produces a report. Probes run sequentially, left then right.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::metrics::{record_probe_hit, record_probe_step};
use crate::residency::{Residency, ResidencyIndex};

/// Outcome of one hole scan. Immutable once produced.
#[derive(Debug, Clone, Serialize)]
pub struct HoleReport {
    /// The probed page index.
    pub target: u64,
    /// Where the left probe stopped, clamped into the extent.
    pub left_boundary: u64,
    /// True when the left probe stopped on a resident page.
    pub left_hit: bool,
    /// Where the right probe stopped, clamped into the extent.
    pub right_boundary: u64,
    /// True when the right probe stopped on a resident page.
    pub right_hit: bool,
    /// The target plus every probed page that was not resident.
    pub missing_pages: u64,
    /// Extent size at scan start, in pages.
    pub total_pages: u64,
    /// Window bound the probes ran under, in pages.
    pub window_pages: u64,
    /// Wall-clock duration of the two probes, in nanoseconds.
    pub elapsed_ns: u64,
}

impl HoleReport {
    /// Probe duration as a `Duration`.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }

    /// Tightened hole extent, inclusive: a hit boundary itself is resident,
    /// so the hole starts one step inside it.
    #[inline]
    pub fn hole_range(&self) -> (u64, u64) {
        (
            self.left_boundary + u64::from(self.left_hit),
            self.right_boundary - u64::from(self.right_hit),
        )
    }
}

impl fmt::Display for HoleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hole_lo, hole_hi) = self.hole_range();
        writeln!(
            f,
            "left boundary:  {} ({})",
            self.left_boundary,
            if self.left_hit { "hit" } else { "miss" }
        )?;
        writeln!(f, "target index:   {}", self.target)?;
        writeln!(
            f,
            "right boundary: {} ({})",
            self.right_boundary,
            if self.right_hit { "hit" } else { "miss" }
        )?;
        writeln!(f, "hole range:     {}..={}", hole_lo, hole_hi)?;
        writeln!(f, "missing pages:  {}", self.missing_pages)?;
        write!(
            f,
            "elapsed:        {} ns (window {} pages, extent {} pages)",
            self.elapsed_ns, self.window_pages, self.total_pages
        )
    }
}

/// Scan the hole around `target` in an extent of `total_pages` pages.
///
/// `total_pages` must be >= 1 (the trigger rejects empty objects before
/// calling in). `target` may legally sit at either extent edge.
pub fn scan_hole<R: ResidencyIndex>(
    index: &R,
    target: u64,
    total_pages: u64,
    window: u64,
) -> HoleReport {
    debug_assert!(total_pages >= 1, "scan_hole needs a non-empty extent");

    let mut missing: u64 = 1;

    let left_budget = window / 2;
    let right_budget = (window / 2).saturating_sub(1);

    let mut left_off: u64 = 0;
    let mut right_off: u64 = 0;
    let mut left_hit = false;
    let mut right_hit = false;

    let started = Instant::now();

    // Left probe.
    loop {
        left_off += 1;
        let status = match target.checked_sub(left_off) {
            Some(i) => index.query(i),
            // Below index 0: nothing to query, the step counts as a miss.
            None => Residency::OutOfRange,
        };
        record_probe_step();
        if status.is_resident() {
            left_hit = true;
            record_probe_hit();
            break;
        }
        missing += 1;
        if !(target > left_off && left_off < left_budget) {
            break;
        }
    }

    // Right probe.
    loop {
        right_off += 1;
        let status = match target.checked_add(right_off) {
            Some(i) => index.query(i),
            None => Residency::OutOfRange,
        };
        record_probe_step();
        if status.is_resident() {
            right_hit = true;
            record_probe_hit();
            break;
        }
        missing += 1;
        let within_extent = match target.checked_add(right_off) {
            Some(i) => i < total_pages - 1,
            None => false,
        };
        if !(within_extent && right_off < right_budget) {
            break;
        }
    }

    let elapsed_ns = started.elapsed().as_nanos().min(u64::MAX as u128) as u64;

    let left_boundary = target.saturating_sub(left_off);
    let right_boundary = target
        .checked_add(right_off)
        .map_or(total_pages - 1, |i| i.min(total_pages - 1));

    HoleReport {
        target,
        left_boundary,
        left_hit,
        right_boundary,
        right_hit,
        missing_pages: missing,
        total_pages,
        window_pages: window,
        elapsed_ns,
    }
}

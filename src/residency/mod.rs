//! residency — point lookups into a file's cached-page residency map.
//!
//! Design:
//! - ResidencyIndex is the capability the scanner probes through: a total,
//!   side-effect-free lookup over the whole u64 index domain. Out-of-range
//!   indices answer OutOfRange; the scanner treats anything that is not
//!   Resident as a miss.
//! - FileResidency is the production accessor: a read-only private mapping
//!   of the file plus one mincore(2) call per queried page. mincore reports
//!   core residency without faulting pages in, so a query never populates
//!   the cache it is inspecting.
//! - MemResidency is an in-memory index for tests and tooling.
//!
//! Queries are point-in-time: concurrent cache population by other activity
//! shows up as whatever state the kernel reports at query time.

use std::collections::HashSet;
use std::fs::File;
use std::io;

use memmap2::Mmap;

use crate::util::ceil_div;

/// Residency status of a single page index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// The page is present in the page cache.
    Resident,
    /// The page is within the object but not cached.
    Absent,
    /// The index lies past the end of the object.
    OutOfRange,
}

impl Residency {
    /// True only for `Resident`; the scanner's hit condition.
    #[inline]
    pub fn is_resident(self) -> bool {
        matches!(self, Residency::Resident)
    }
}

/// A total, side-effect-free residency lookup.
///
/// Implementations must not fault pages in or trigger readahead as a side
/// effect of being queried.
pub trait ResidencyIndex {
    fn query(&self, index: u64) -> Residency;
}

/// Plain closures work as indices; handy in tests.
impl<F> ResidencyIndex for F
where
    F: Fn(u64) -> Residency,
{
    #[inline]
    fn query(&self, index: u64) -> Residency {
        self(index)
    }
}

/// mincore-backed residency index over a read-only file mapping.
pub struct FileResidency {
    map: Mmap,
    page_size: usize,
    pages: u64,
}

impl FileResidency {
    /// Map `file` read-only and derive the page count from the mapped length.
    /// An empty file maps fine but answers OutOfRange everywhere; callers
    /// reject empty objects before building an accessor.
    pub fn map(file: &File, page_size: usize) -> io::Result<Self> {
        let map = unsafe { Mmap::map(file)? };
        let pages = ceil_div(map.len() as u64, page_size as u64);
        Ok(Self {
            map,
            page_size,
            pages,
        })
    }

    /// Number of pages covered by the mapping.
    #[inline]
    pub fn pages(&self) -> u64 {
        self.pages
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

impl ResidencyIndex for FileResidency {
    fn query(&self, index: u64) -> Residency {
        if index >= self.pages {
            return Residency::OutOfRange;
        }
        let off = index as usize * self.page_size;
        let len = self.page_size.min(self.map.len() - off);

        // One page per call; mincore wants a page-aligned address, which
        // every page offset into the mapping is.
        let mut vec = [0u8; 1];
        let rc = unsafe {
            libc::mincore(
                self.map.as_ptr().add(off) as *mut libc::c_void,
                len,
                vec.as_mut_ptr(),
            )
        };
        if rc != 0 {
            // Treat a failed probe as not-cached rather than surfacing an
            // error: the lookup contract is total.
            return Residency::Absent;
        }
        if vec[0] & 1 == 1 {
            Residency::Resident
        } else {
            Residency::Absent
        }
    }
}

/// In-memory residency index: a bounded extent with an explicit resident set.
/// Used by tests and tooling; everything unmarked is Absent.
#[derive(Debug, Default, Clone)]
pub struct MemResidency {
    resident: HashSet<u64>,
    pages: u64,
}

impl MemResidency {
    /// An extent of `pages` indices, all initially absent.
    pub fn new(pages: u64) -> Self {
        Self {
            resident: HashSet::new(),
            pages,
        }
    }

    pub fn mark_resident(&mut self, index: u64) {
        self.resident.insert(index);
    }

    pub fn mark_absent(&mut self, index: u64) {
        self.resident.remove(&index);
    }

    #[inline]
    pub fn pages(&self) -> u64 {
        self.pages
    }
}

impl ResidencyIndex for MemResidency {
    #[inline]
    fn query(&self, index: u64) -> Residency {
        if index >= self.pages {
            Residency::OutOfRange
        } else if self.resident.contains(&index) {
            Residency::Resident
        } else {
            Residency::Absent
        }
    }
}

/// A maximal run of same-status pages, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: u64,
    pub end: u64,
    pub resident: bool,
}

impl Run {
    /// Pages covered; never zero (end is inclusive).
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Full residency picture of an extent, as run-length segments.
#[derive(Debug, Clone)]
pub struct ResidencySummary {
    pub runs: Vec<Run>,
    pub resident_pages: u64,
    pub total_pages: u64,
    /// True when the run list was cut short by `max_runs`.
    pub truncated: bool,
}

/// Walk `0..total_pages` and collect maximal resident/absent runs.
/// Counts are exact even when the stored run list is capped.
pub fn collect_runs<R: ResidencyIndex>(
    index: &R,
    total_pages: u64,
    max_runs: usize,
) -> ResidencySummary {
    let mut runs: Vec<Run> = Vec::new();
    let mut resident_pages = 0u64;
    let mut truncated = false;

    for i in 0..total_pages {
        let resident = index.query(i).is_resident();
        if resident {
            resident_pages += 1;
        }
        let absorbed = match runs.last_mut() {
            Some(run) if run.resident == resident && run.end + 1 == i => {
                run.end = i;
                true
            }
            // Same status but not adjacent: a run in between was already
            // dropped by the cap, so this one is dropped too.
            Some(run) if run.resident == resident => true,
            _ => false,
        };
        if !absorbed {
            if runs.len() < max_runs {
                runs.push(Run {
                    start: i,
                    end: i,
                    resident,
                });
            } else {
                truncated = true;
            }
        }
    }

    ResidencySummary {
        runs,
        resident_pages,
        total_pages,
        truncated,
    }
}

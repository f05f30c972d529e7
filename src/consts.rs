//! Shared constants (control protocol, scan defaults, env var names).

// -------- Control interface --------

/// Maximum accepted request line, in bytes, including the trailing newline.
pub const MAX_PATH_LEN: usize = 256;

/// Default control socket path for `pagehole serve`.
pub const DEFAULT_SOCKET: &str = "/tmp/pagehole.sock";

/// Lock file created next to the control socket (single-instance guard).
pub const CTL_LOCK_SUFFIX: &str = ".lock";

// -------- Scan defaults --------

/// Default target page index probed by a scan.
/// A fixed configuration value, not derived from the request.
pub const DEFAULT_TARGET_INDEX: u64 = 16;

/// Fallback readahead when the backing device exposes no hint
/// (128 KiB, the kernel default).
pub const DEFAULT_READAHEAD_BYTES: u64 = 128 * 1024;

/// Fallback page size if sysconf cannot be queried.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

// -------- Environment --------

pub const ENV_TARGET_INDEX: &str = "PGH_TARGET_INDEX";
pub const ENV_WINDOW_PAGES: &str = "PGH_WINDOW_PAGES";
pub const ENV_SOCKET: &str = "PGH_SOCKET";

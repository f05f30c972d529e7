//! Centralized configuration for pagehole.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - ScanConfig::from_env() reads the PGH_* variables; fluent with_* setters
//!   allow programmatic overrides on top (CLI flags win over env).
//!
//! Tunables:
//! - target_index: the page index a scan probes around. Fixed per process,
//!   never derived from the submitted path.
//! - window_pages: optional override of the per-object probe window; when
//!   None the window comes from the backing device's readahead setting.
//! - page_size: optional override of the cache page granularity; when None
//!   it is taken from sysconf(_SC_PAGESIZE).
//! - socket: control socket path for `serve`.

use std::fmt;
use std::path::PathBuf;

use crate::consts::{
    DEFAULT_SOCKET, DEFAULT_TARGET_INDEX, ENV_SOCKET, ENV_TARGET_INDEX, ENV_WINDOW_PAGES,
};

/// Top-level configuration for scans and the control surface.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    /// Page index probed by every scan.
    /// Env: PGH_TARGET_INDEX (default 16)
    pub target_index: u64,

    /// Probe window override, in pages. None means "ask the backing device".
    /// Env: PGH_WINDOW_PAGES (default unset)
    pub window_pages: Option<u64>,

    /// Page granularity override, in bytes. None means sysconf(_SC_PAGESIZE).
    pub page_size: Option<usize>,

    /// Control socket path used by `serve`.
    /// Env: PGH_SOCKET (default /tmp/pagehole.sock)
    pub socket: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target_index: DEFAULT_TARGET_INDEX,
            window_pages: None,
            page_size: None,
            socket: PathBuf::from(DEFAULT_SOCKET),
        }
    }
}

impl ScanConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var(ENV_TARGET_INDEX) {
            if let Ok(n) = v.trim().parse::<u64>() {
                cfg.target_index = n;
            }
        }

        if let Ok(v) = std::env::var(ENV_WINDOW_PAGES) {
            if let Ok(n) = v.trim().parse::<u64>() {
                if n > 0 {
                    cfg.window_pages = Some(n);
                }
            }
        }

        if let Ok(v) = std::env::var(ENV_SOCKET) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.socket = PathBuf::from(s);
            }
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_target_index(mut self, idx: u64) -> Self {
        self.target_index = idx;
        self
    }

    pub fn with_window_pages(mut self, pages: Option<u64>) -> Self {
        self.window_pages = pages;
        self
    }

    pub fn with_page_size(mut self, bytes: Option<usize>) -> Self {
        self.page_size = bytes;
        self
    }

    pub fn with_socket<P: Into<PathBuf>>(mut self, socket: P) -> Self {
        self.socket = socket.into();
        self
    }
}

impl fmt::Display for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ScanConfig {{ target_index: {}, window_pages: {}, page_size: {}, socket: {} }}",
            self.target_index,
            self.window_pages
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default(bdi readahead)".to_string()),
            self.page_size
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default(sysconf)".to_string()),
            self.socket.display(),
        )
    }
}

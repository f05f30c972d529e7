//! ctl — the command interface: one newline-terminated path per connection
//! over a unix stream socket.
//!
//! Protocol:
//! - A client connects, writes a path terminated by '\n' (256 bytes max
//!   including the newline) and reads the response.
//! - Success: the diagnostic report lines. Failure: "ERR <kind>: <detail>".
//! - Each request is read into its own buffer; nothing is shared between
//!   connections except the read-only scan configuration.
//!
//! Lifecycle:
//! - bind() takes a <socket>.lock advisory lock (single instance per socket
//!   path), clears a stale socket file and listens.
//! - Drop unlinks the socket file; the lock file stays and is reused.

pub mod exporter;

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use log::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::consts::{CTL_LOCK_SUFFIX, MAX_PATH_LEN};
use crate::metrics::{record_ctl_reject, record_ctl_request};
use crate::trigger::{run_scan, TriggerError};

/// Listening command interface bound to a socket path.
pub struct CtlServer {
    listener: UnixListener,
    socket: PathBuf,
    // Held for the server's lifetime; released by Drop.
    _lock: std::fs::File,
}

impl CtlServer {
    /// Install the command interface at `socket`.
    ///
    /// Refuses to start when another server holds the lock for the same
    /// socket path. A stale socket file left by a dead server is removed.
    pub fn bind(socket: &Path) -> Result<Self> {
        let lock_path = lock_path_for(socket);
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("open ctl lock {}", lock_path.display()))?;
        lock.try_lock_exclusive().with_context(|| {
            format!(
                "another pagehole instance is serving {} (lock {})",
                socket.display(),
                lock_path.display()
            )
        })?;

        if socket.exists() {
            warn!("removing stale ctl socket {}", socket.display());
            fs::remove_file(socket)
                .with_context(|| format!("remove stale socket {}", socket.display()))?;
        }

        let listener = UnixListener::bind(socket)
            .with_context(|| format!("bind ctl socket {}", socket.display()))?;
        info!("ctl listening on {}", socket.display());

        Ok(Self {
            listener,
            socket: socket.to_path_buf(),
            _lock: lock,
        })
    }

    /// The bound socket path.
    pub fn socket(&self) -> &Path {
        &self.socket
    }

    /// Accept one connection and service its single request.
    ///
    /// Transport errors on the accepted stream are logged, not returned;
    /// only a failed accept aborts (the listener itself is broken then).
    pub fn handle_next(&self, cfg: &ScanConfig) -> Result<()> {
        let (stream, _addr) = self
            .listener
            .accept()
            .with_context(|| format!("accept on {}", self.socket.display()))?;
        if let Err(e) = handle_connection(stream, cfg) {
            error!("ctl connection error: {:#}", e);
        }
        Ok(())
    }

    /// Serve until the process dies. Accept failures are logged and retried.
    pub fn serve_forever(&self, cfg: &ScanConfig) -> ! {
        loop {
            if let Err(e) = self.handle_next(cfg) {
                error!("{:#}", e);
            }
        }
    }
}

impl Drop for CtlServer {
    fn drop(&mut self) {
        // Best-effort removal; a stale socket is also handled at bind().
        let _ = fs::remove_file(&self.socket);
    }
}

fn lock_path_for(socket: &Path) -> PathBuf {
    let mut os = socket.as_os_str().to_os_string();
    os.push(CTL_LOCK_SUFFIX);
    PathBuf::from(os)
}

fn handle_connection(mut stream: UnixStream, cfg: &ScanConfig) -> Result<()> {
    record_ctl_request();

    let raw = read_line_capped(&mut stream).context("read request")?;
    let reply = match validate_line(raw) {
        Ok(path) => {
            info!("ctl request: scan '{}'", path);
            match run_scan(&path, cfg) {
                Ok(report) => {
                    let mut body = report.to_string();
                    for line in body.lines() {
                        info!("{}", line);
                    }
                    body.push('\n');
                    body
                }
                Err(e) => {
                    record_ctl_reject();
                    error!("scan '{}' failed: {}", path, e);
                    format!("ERR {}: {}\n", e.kind(), e)
                }
            }
        }
        Err(reject) => {
            record_ctl_reject();
            format!("ERR {}: {}\n", reject.kind(), reject)
        }
    };

    stream.write_all(reply.as_bytes()).context("write reply")?;
    finish(stream);

    let m = crate::metrics::snapshot();
    debug!(
        "ctl totals: requests={} rejects={} scans={}",
        m.ctl_requests_total, m.ctl_rejects_total, m.scans_total
    );
    Ok(())
}

/// Half-close and drain whatever the client sent past the line cap, so the
/// reply reaches it as data + EOF instead of a connection reset.
fn finish(mut stream: UnixStream) {
    let _ = stream.shutdown(std::net::Shutdown::Write);
    let mut sink = [0u8; 512];
    let mut budget: usize = 64 * 1024;
    while budget > 0 {
        match stream.read(&mut sink) {
            Ok(0) | Err(_) => break,
            Ok(n) => budget = budget.saturating_sub(n),
        }
    }
}

/// Read one request line into a per-connection buffer. Stops at the first
/// newline or after MAX_PATH_LEN + 1 bytes, whichever comes first; the
/// spare byte lets validation tell an over-long line from an exactly-full
/// one.
fn read_line_capped(stream: &mut UnixStream) -> std::io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::with_capacity(MAX_PATH_LEN);
    let mut reader = BufReader::new(Read::take(&mut *stream, MAX_PATH_LEN as u64 + 1));
    reader.read_until(b'\n', &mut buf)?;
    Ok(buf)
}

/// Enforce the line bound and strip the terminator. A client that closes
/// without a newline gets its bytes treated as the whole line.
fn validate_line(mut buf: Vec<u8>) -> Result<String, TriggerError> {
    let had_newline = buf.last() == Some(&b'\n');
    if buf.len() > MAX_PATH_LEN || (buf.len() == MAX_PATH_LEN && !had_newline) {
        return Err(TriggerError::PathTooLong {
            len: buf.len(),
            limit: MAX_PATH_LEN - 1,
        });
    }
    if had_newline {
        buf.pop();
    }
    if buf.is_empty() {
        return Err(TriggerError::EmptyPath);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

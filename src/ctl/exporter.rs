//! Prometheus-style metrics endpoint for the serve process.
//!
//! Exposes the process-local counters at /metrics plus /health for
//! liveness probes. Runs on its own thread next to the ctl accept loop.

use anyhow::{anyhow, Result};
use log::{error, info};
use tiny_http::{Header, Response, Server};

use crate::metrics;

/// Bind `addr` and serve the exposition on a background thread.
pub fn spawn(addr: &str) -> Result<std::thread::JoinHandle<()>> {
    let server = Server::http(addr).map_err(|e| anyhow!("bind http at {}: {}", addr, e))?;
    info!("metrics exporter listening on {}", addr);
    Ok(std::thread::spawn(move || serve(server)))
}

fn serve(server: Server) {
    loop {
        let rq = match server.recv() {
            Ok(rq) => rq,
            Err(e) => {
                error!("http recv error: {}", e);
                continue;
            }
        };

        let url = rq.url().to_string();
        let method = rq.method().as_str().to_string();

        if method == "GET" && (url == "/" || url == "/health" || url == "/ready") {
            let resp = Response::from_string("OK\n").with_status_code(200);
            let _ = rq.respond(resp);
            continue;
        }

        if method == "GET" && url == "/metrics" {
            let mut resp = Response::from_string(build_metrics());
            if let Ok(ct) = Header::from_bytes(b"Content-Type", b"text/plain; version=0.0.4") {
                resp.add_header(ct);
            }
            let _ = rq.respond(resp);
            continue;
        }

        let resp = Response::from_string("not found\n").with_status_code(404);
        let _ = rq.respond(resp);
    }
}

fn build_metrics() -> String {
    let m = metrics::snapshot();
    let mut out = String::new();

    let ver = env!("CARGO_PKG_VERSION");
    out.push_str("# HELP pagehole_build_info Build info.\n");
    out.push_str("# TYPE pagehole_build_info gauge\n");
    out.push_str(&format!("pagehole_build_info{{version=\"{}\"}} 1\n", ver));

    out.push_str("# HELP pagehole_scans_total Completed hole scans.\n");
    out.push_str("# TYPE pagehole_scans_total counter\n");
    out.push_str(&format!("pagehole_scans_total {}\n", m.scans_total));

    out.push_str("# HELP pagehole_scan_failures_total Scan requests that failed before reporting.\n");
    out.push_str("# TYPE pagehole_scan_failures_total counter\n");
    out.push_str(&format!(
        "pagehole_scan_failures_total {}\n",
        m.scan_failures_total
    ));

    out.push_str("# HELP pagehole_scan_nanos_total Accumulated probe time in nanoseconds.\n");
    out.push_str("# TYPE pagehole_scan_nanos_total counter\n");
    out.push_str(&format!("pagehole_scan_nanos_total {}\n", m.scan_nanos_total));

    out.push_str("# HELP pagehole_hole_pages_total Missing pages reported across all scans.\n");
    out.push_str("# TYPE pagehole_hole_pages_total counter\n");
    out.push_str(&format!("pagehole_hole_pages_total {}\n", m.hole_pages_total));

    out.push_str("# HELP pagehole_probe_steps_total Probe steps taken across all scans.\n");
    out.push_str("# TYPE pagehole_probe_steps_total counter\n");
    out.push_str(&format!("pagehole_probe_steps_total {}\n", m.probe_steps_total));

    out.push_str("# HELP pagehole_probe_hits_total Probe steps that found a resident page.\n");
    out.push_str("# TYPE pagehole_probe_hits_total counter\n");
    out.push_str(&format!("pagehole_probe_hits_total {}\n", m.probe_hits_total));

    out.push_str("# HELP pagehole_ctl_requests_total Connections accepted on the ctl socket.\n");
    out.push_str("# TYPE pagehole_ctl_requests_total counter\n");
    out.push_str(&format!(
        "pagehole_ctl_requests_total {}\n",
        m.ctl_requests_total
    ));

    out.push_str("# HELP pagehole_ctl_rejects_total Requests answered with an error.\n");
    out.push_str("# TYPE pagehole_ctl_rejects_total counter\n");
    out.push_str(&format!("pagehole_ctl_rejects_total {}\n", m.ctl_rejects_total));

    out
}

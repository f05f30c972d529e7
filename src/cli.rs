use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::fs::File;
use std::path::PathBuf;

use crate::config::ScanConfig;
use crate::ctl::{exporter, CtlServer};
use crate::metrics;
use crate::residency::{collect_runs, FileResidency};
use crate::trigger::run_scan;
use crate::util::{ceil_div, system_page_size};

#[derive(Parser, Debug)]
#[command(
    name = "pagehole",
    version,
    about = "Page cache hole scanner: bounded bidirectional residency probe",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Run one hole scan against a file and print the report.
    Scan {
        path: PathBuf,
        /// Override the configured target page index.
        #[arg(long)]
        target: Option<u64>,
        /// Override the probe window (pages); default asks the backing device.
        #[arg(long)]
        window: Option<u64>,
        /// Emit the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the resident/absent run map of a whole file.
    Map {
        path: PathBuf,
        /// Cap on the number of runs listed (counts stay exact).
        #[arg(long, default_value_t = 64)]
        max_runs: usize,
    },

    /// Install the command interface and serve scan requests.
    Serve {
        /// Control socket path; defaults to PGH_SOCKET or /tmp/pagehole.sock.
        #[arg(long)]
        socket: Option<PathBuf>,
        /// Also expose process metrics over HTTP at this address.
        #[arg(long)]
        metrics_addr: Option<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = ScanConfig::from_env();

    match cli.cmd {
        Cmd::Scan {
            path,
            target,
            window,
            json,
        } => {
            let mut cfg = cfg;
            if let Some(t) = target {
                cfg.target_index = t;
            }
            if let Some(w) = window {
                cfg.window_pages = Some(w);
            }
            let report = run_scan(&path.to_string_lossy(), &cfg)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report);
            }

            let m = metrics::snapshot();
            debug!(
                "Metrics: scans={} probe_steps={} probe_hits={} avg_scan_ns={:.0}",
                m.scans_total,
                m.probe_steps_total,
                m.probe_hits_total,
                m.avg_scan_nanos()
            );
        }

        Cmd::Map { path, max_runs } => {
            let file =
                File::open(&path).with_context(|| format!("open {}", path.display()))?;
            let meta = file
                .metadata()
                .with_context(|| format!("stat {}", path.display()))?;
            let page_size = cfg.page_size.unwrap_or_else(system_page_size);
            let total_pages = ceil_div(meta.len(), page_size as u64);
            if total_pages == 0 {
                bail!("{} is empty, nothing to map", path.display());
            }
            let index = FileResidency::map(&file, page_size)
                .with_context(|| format!("map {}", path.display()))?;
            let summary = collect_runs(&index, total_pages, max_runs);

            println!("Residency of {}", path.display());
            println!("  page_size = {} bytes", page_size);
            println!("  pages     = {}", summary.total_pages);
            println!("  resident  = {}", summary.resident_pages);
            println!(
                "  absent    = {}",
                summary.total_pages - summary.resident_pages
            );
            for run in &summary.runs {
                println!(
                    "  {:>8}..={:<8} {:8} ({} pages)",
                    run.start,
                    run.end,
                    if run.resident { "resident" } else { "absent" },
                    run.len()
                );
            }
            if summary.truncated {
                println!("  ... (run list capped at {})", max_runs);
            }
        }

        Cmd::Serve {
            socket,
            metrics_addr,
        } => {
            let mut cfg = cfg;
            if let Some(s) = socket {
                cfg.socket = s;
            }
            info!("{}", cfg);

            let _exporter = match metrics_addr {
                Some(addr) => Some(exporter::spawn(&addr)?),
                None => None,
            };

            let server = CtlServer::bind(&cfg.socket)?;
            server.serve_forever(&cfg)
        }
    }
    Ok(())
}

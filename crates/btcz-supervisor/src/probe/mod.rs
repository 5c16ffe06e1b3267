//! Inspecting the daemon through the operating system's process listing.
//!
//! Unix hosts are inspected with `ps auxwww` and Windows hosts with
//! `tasklist`. Both listings are parsed positionally. A listing that cannot be
//! produced yields [`DaemonState::Unknown`], which callers must not read as
//! "not running".

use std::time::Duration;

use btcz_rpc::CommandRunner;
use tracing::{debug, warn};

/// Tracing target for process listing.
const PROBE_TARGET: &str = "btcz_supervisor::probe";

/// Execution budget for one listing command.
pub const LISTING_BUDGET: Duration = Duration::from_secs(10);

/// Resource usage of a running daemon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceUsage {
    /// Process identifier.
    pub pid: u32,
    /// CPU usage in percent, when the listing reports it.
    pub cpu_percent: Option<f64>,
    /// Resident memory in KiB.
    pub resident_kib: u64,
    /// Virtual memory in KiB, when the listing reports it.
    pub virtual_kib: Option<u64>,
}

/// Whether the daemon appears in the process listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DaemonState {
    /// The listing was produced and contains no matching process.
    NotRunning,
    /// A matching process was found.
    Running(ResourceUsage),
    /// The listing could not be produced.
    Unknown,
}

/// Process listing dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingFormat {
    /// `ps auxwww` columns: user, pid, %cpu, %mem, vsz, rss, tty, stat,
    /// start, time, command.
    Ps,
    /// `tasklist` columns: image name, pid, session name, session number,
    /// memory usage.
    Tasklist,
}

impl ListingFormat {
    /// Dialect used on this platform.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) { Self::Tasklist } else { Self::Ps }
    }

    fn argv(self) -> Vec<String> {
        match self {
            Self::Ps => vec![String::from("ps"), String::from("auxwww")],
            Self::Tasklist => vec![String::from("tasklist")],
        }
    }
}

/// Looks the daemon up in the process listing.
#[derive(Debug)]
pub struct ProcessStatusProbe<'a, R> {
    runner: &'a R,
    format: ListingFormat,
}

impl<'a, R: CommandRunner> ProcessStatusProbe<'a, R> {
    /// Creates a probe using the platform's listing dialect.
    #[must_use]
    pub const fn new(runner: &'a R) -> Self {
        Self {
            runner,
            format: ListingFormat::native(),
        }
    }

    /// Overrides the listing dialect.
    #[must_use]
    pub const fn with_format(mut self, format: ListingFormat) -> Self {
        self.format = format;
        self
    }

    /// Reports whether a process named `process_name` is running.
    ///
    /// The name matches a listed command exactly or as the final path
    /// component.
    #[must_use]
    pub fn probe(&self, process_name: &str) -> DaemonState {
        let output = match self.runner.execute(&self.format.argv(), LISTING_BUDGET) {
            Ok(output) if output.exit_code == Some(0) => output,
            Ok(output) => {
                warn!(
                    target: PROBE_TARGET,
                    exit_code = ?output.exit_code,
                    "process listing failed"
                );
                return DaemonState::Unknown;
            }
            Err(error) => {
                warn!(target: PROBE_TARGET, %error, "process listing unavailable");
                return DaemonState::Unknown;
            }
        };

        let usage = match self.format {
            ListingFormat::Ps => parse_ps_listing(&output.text, process_name),
            ListingFormat::Tasklist => parse_tasklist(&output.text, process_name),
        };
        debug!(target: PROBE_TARGET, process_name, ?usage, "probed process listing");
        usage.map_or(DaemonState::NotRunning, DaemonState::Running)
    }
}

/// Finds `process_name` in `ps auxwww` output.
#[must_use]
pub fn parse_ps_listing(listing: &str, process_name: &str) -> Option<ResourceUsage> {
    let suffix = format!("/{process_name}");
    listing.lines().skip(1).find_map(|line| {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let command = *columns.get(10)?;
        if command != process_name && !command.ends_with(&suffix) {
            return None;
        }
        Some(ResourceUsage {
            pid: columns.get(1)?.parse().ok()?,
            cpu_percent: columns.get(2).and_then(|cpu| cpu.parse().ok()),
            resident_kib: columns.get(5).and_then(|rss| rss.parse().ok()).unwrap_or(0),
            virtual_kib: columns.get(4).and_then(|vsz| vsz.parse().ok()),
        })
    })
}

/// Finds `process_name` in `tasklist` output.
///
/// Image names compare case-insensitively. Memory usage is read from the
/// digits of the fifth and later columns, so `123,456 K` and `123.456 K` both
/// read as 123456 KiB.
#[must_use]
pub fn parse_tasklist(listing: &str, process_name: &str) -> Option<ResourceUsage> {
    listing.lines().find_map(|line| {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let image = columns.first()?.trim_matches('"');
        if !image.eq_ignore_ascii_case(process_name) {
            return None;
        }
        let memory: String = columns
            .iter()
            .skip(4)
            .flat_map(|column| column.chars())
            .filter(char::is_ascii_digit)
            .collect();
        Some(ResourceUsage {
            pid: columns.get(1)?.trim_matches('"').parse().ok()?,
            cpu_percent: None,
            resident_kib: memory.parse().unwrap_or(0),
            virtual_kib: None,
        })
    })
}

//! Default values shared by the configuration and the binaries.
//!
//! Installation and data directories follow the platform conventions of the
//! BitcoinZ reference daemon.

use std::env;

use camino::Utf8PathBuf;

/// Default daemon executable name.
pub const DEFAULT_DAEMON_BINARY: &str = "bitcoinzd";

/// Default command-line client executable name.
pub const DEFAULT_CLIENT_BINARY: &str = "bitcoinz-cli";

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default execution budget for one client invocation, in seconds.
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 120;

/// Default delay between startup probes, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1200;

/// Default log filter expression used by the binaries.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

pub(crate) fn default_daemon_binary_string() -> String {
    DEFAULT_DAEMON_BINARY.to_owned()
}

pub(crate) fn default_client_binary_string() -> String {
    DEFAULT_CLIENT_BINARY.to_owned()
}

pub(crate) const fn default_rpc_timeout_secs() -> u64 {
    DEFAULT_RPC_TIMEOUT_SECS
}

pub(crate) const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Default logging format for the binaries.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}

/// Appends the platform executable suffix to a canonical binary name.
#[must_use]
pub fn executable_name(canonical: &str) -> String {
    if cfg!(windows) && !canonical.to_ascii_lowercase().ends_with(".exe") {
        format!("{canonical}.exe")
    } else {
        canonical.to_owned()
    }
}

/// Directory containing the running executable, or the working directory.
#[must_use]
pub fn default_install_dir() -> Utf8PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(std::path::Path::to_path_buf))
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

/// Platform data directory used by the daemon.
#[must_use]
pub fn default_data_dir() -> Utf8PathBuf {
    data_dir_inner().unwrap_or_else(|| Utf8PathBuf::from(".bitcoinz"))
}

#[cfg(target_os = "macos")]
fn data_dir_inner() -> Option<Utf8PathBuf> {
    let mut base = utf8(dirs::home_dir()?)?;
    base.push("Library");
    base.push("Application Support");
    base.push("BitcoinZ");
    Some(base)
}

#[cfg(windows)]
fn data_dir_inner() -> Option<Utf8PathBuf> {
    let mut base = utf8(dirs::data_dir()?)?;
    base.push("BitcoinZ");
    Some(base)
}

#[cfg(not(any(windows, target_os = "macos")))]
fn data_dir_inner() -> Option<Utf8PathBuf> {
    let mut base = utf8(dirs::home_dir()?)?;
    base.push(".bitcoinz");
    Some(base)
}

/// User home directory, used as the daemon's export directory.
#[must_use]
pub fn default_export_dir() -> Utf8PathBuf {
    dirs::home_dir()
        .and_then(utf8)
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

fn utf8(path: std::path::PathBuf) -> Option<Utf8PathBuf> {
    Utf8PathBuf::from_path_buf(path).ok()
}

//! Shared configuration for the BitcoinZ wallet front-end.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a
//! configuration file, then `BTCZ_*` environment variables, then
//! command-line flags. Every field has a default so a bare invocation works
//! on a standard installation.

use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod policy;

pub use defaults::{
    DEFAULT_CLIENT_BINARY, DEFAULT_DAEMON_BINARY, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_RPC_TIMEOUT_SECS, default_data_dir, default_export_dir, default_install_dir,
    default_log_filter, default_log_format, executable_name,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use policy::{LateLoadingPolicy, LateLoadingPolicyParseError};

/// Runtime configuration consumed by the CLI, the supervisor, and the RPC
/// client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BTCZ")]
pub struct Config {
    /// Directory holding `bitcoinzd` and `bitcoinz-cli`.
    #[serde(default)]
    pub install_dir: Option<Utf8PathBuf>,
    /// Daemon data directory containing `bitcoinz.conf`.
    #[serde(default)]
    pub data_dir: Option<Utf8PathBuf>,
    /// Directory passed to the daemon as `-exportdir`.
    #[serde(default)]
    pub export_dir: Option<Utf8PathBuf>,
    /// Canonical daemon executable name, without platform suffix.
    #[serde(default = "defaults::default_daemon_binary_string")]
    pub daemon_binary: String,
    /// Canonical client executable name, without platform suffix.
    #[serde(default = "defaults::default_client_binary_string")]
    pub client_binary: String,
    /// Execution budget for a single client invocation.
    #[serde(default = "defaults::default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Delay between startup probes.
    #[serde(default = "defaults::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How "still loading" errors are treated once startup has completed.
    #[serde(default)]
    pub late_loading: LateLoadingPolicy,
    /// Tracing filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Tracing output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            install_dir: None,
            data_dir: None,
            export_dir: None,
            daemon_binary: defaults::default_daemon_binary_string(),
            client_binary: defaults::default_client_binary_string(),
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            late_loading: LateLoadingPolicy::default(),
            log_filter: defaults::default_log_filter_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Installation directory, falling back to the executable's directory.
    #[must_use]
    pub fn install_dir(&self) -> Utf8PathBuf {
        self.install_dir.clone().unwrap_or_else(default_install_dir)
    }

    /// Daemon data directory, falling back to the platform default.
    #[must_use]
    pub fn data_dir(&self) -> Utf8PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Export directory handed to the daemon at launch.
    #[must_use]
    pub fn export_dir(&self) -> Utf8PathBuf {
        self.export_dir.clone().unwrap_or_else(default_export_dir)
    }

    /// Path of the daemon's key=value configuration file.
    #[must_use]
    pub fn daemon_config_path(&self) -> Utf8PathBuf {
        self.data_dir().join("bitcoinz.conf")
    }

    /// Platform-specific daemon executable file name.
    #[must_use]
    pub fn daemon_executable(&self) -> String {
        executable_name(&self.daemon_binary)
    }

    /// Platform-specific client executable file name.
    #[must_use]
    pub fn client_executable(&self) -> String {
        executable_name(&self.client_binary)
    }

    /// Execution budget for a single client invocation.
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    /// Delay between startup probes.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Policy for "still loading" errors after startup.
    #[must_use]
    pub const fn late_loading(&self) -> LateLoadingPolicy {
        self.late_loading
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Tracing output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

//! Error types for installation discovery and daemon supervision.

use std::sync::Arc;

use btcz_rpc::{RpcError, RunnerError};
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while locating the daemon installation.
#[derive(Debug, Clone, Error)]
pub enum LocatorError {
    /// A required executable was found neither in the installation directory
    /// nor on the search path.
    #[error("cannot find '{executable}' in {install_dir} or on the search path")]
    InstallationNotFound {
        /// Executable that is missing.
        executable: String,
        /// Installation directory that was searched first.
        install_dir: Utf8PathBuf,
    },

    /// The daemon configuration file exists but could not be read.
    #[error("failed to read daemon configuration {path}: {source}")]
    ReadNetworkConfig {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Errors raised while starting the daemon.
#[derive(Debug, Clone, Error)]
pub enum SupervisorError {
    /// The readiness probe failed in a way polling cannot recover from.
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// The daemon executable could not be launched.
    #[error("failed to launch daemon '{program}': {source}")]
    Launch {
        /// Daemon executable.
        program: String,
        /// Launch failure.
        #[source]
        source: RunnerError,
    },

    /// The daemon stayed unreachable beyond the tolerated number of probes.
    #[error("daemon not reachable after {iterations} probes: {last_response}")]
    NotReady {
        /// Probes issued before giving up.
        iterations: u32,
        /// Last progress message reported while loading, if any.
        last_message: Option<String>,
        /// Raw text of the final failed probe.
        last_response: String,
    },

    /// The self-started daemon exited while startup was being polled.
    #[error("daemon process exited during startup after {iterations} probes")]
    DaemonExited {
        /// Probes issued before the exit was noticed.
        iterations: u32,
    },

    /// Startup was abandoned because shutdown was requested while polling.
    #[error("daemon startup cancelled after {iterations} probes")]
    Cancelled {
        /// Probes issued before the request was noticed.
        iterations: u32,
    },
}

impl SupervisorError {
    /// Returns true when the failure means the daemon could not be talked to,
    /// as opposed to a missing or broken installation.
    #[must_use]
    pub const fn is_communication_failure(&self) -> bool {
        match self {
            Self::Rpc(error) => error.is_communication_failure(),
            Self::NotReady { .. } | Self::DaemonExited { .. } => true,
            Self::Launch { .. } | Self::Cancelled { .. } => false,
        }
    }
}

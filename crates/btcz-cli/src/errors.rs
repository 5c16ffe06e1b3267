//! Error types and exit-code mapping for the CLI runtime.

use std::io;
use std::sync::Arc;

use btcz_rpc::RpcError;
use btcz_supervisor::{LocatorError, SupervisorError};
use thiserror::Error;

use crate::telemetry::TelemetryError;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code when the daemon or client executable cannot be found.
pub const EXIT_INSTALLATION_NOT_FOUND: u8 = 1;
/// Exit code when the daemon cannot be talked to.
pub const EXIT_COMMUNICATION_FAILURE: u8 = 2;
/// Exit code for any other failure.
pub const EXIT_UNEXPECTED: u8 = 3;
/// Exit code after a panic.
pub const EXIT_UNRECOVERABLE: u8 = 4;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Locate(#[from] LocatorError),
    #[error("daemon startup failed: {0}")]
    Supervisor(#[from] SupervisorError),
    #[error("daemon call failed: {0}")]
    Rpc(#[from] RpcError),
    #[error("failed to serialise result: {0}")]
    Serialise(serde_json::Error),
    #[error("failed to install signal handlers: {0}")]
    InstallSignals(io::Error),
    #[error("failed to start background task '{task}': {source}")]
    SpawnTask {
        task: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

impl AppError {
    /// Process exit code for this failure.
    pub(crate) const fn exit_code(&self) -> u8 {
        match self {
            Self::Locate(LocatorError::InstallationNotFound { .. }) => EXIT_INSTALLATION_NOT_FOUND,
            Self::Supervisor(error) if error.is_communication_failure() => {
                EXIT_COMMUNICATION_FAILURE
            }
            Self::Rpc(error) if error.is_communication_failure() => EXIT_COMMUNICATION_FAILURE,
            _ => EXIT_UNEXPECTED,
        }
    }
}

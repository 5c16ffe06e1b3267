//! Tracing setup for a wallet run.
//!
//! Log records go to stderr. Stdout carries command results only, so scripts
//! can pipe balances and addresses without filtering log noise. The filter
//! and format come from [`Config`]; `--log-format=json` switches to one JSON
//! object per line.

use std::io::{self, IsTerminal};

use btcz_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

static SUBSCRIBER_INSTALLED: OnceCell<()> = OnceCell::new();

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` is not a valid `EnvFilter` directive.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Another global subscriber got there first.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the stderr subscriber once per process.
pub(crate) fn initialise(config: &Config) -> Result<(), TelemetryError> {
    SUBSCRIBER_INSTALLED
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| ())
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;
    let colour = io::stderr().is_terminal();

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .flatten_event(true)
                .finish(),
        ),
        LogFormat::Compact => Box::new(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(io::stderr)
                .with_ansi(colour)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .compact()
                .finish(),
        ),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

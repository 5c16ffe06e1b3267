//! Command-line runtime for the BitcoinZ wallet front-end.
//!
//! The runtime splits configuration flags from the command, loads layered
//! configuration, locates the daemon installation, and runs the command
//! against a supervised daemon. Configuration loading and the output streams
//! can be substituted so the whole flow is testable without a real daemon.

use std::ffi::OsString;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::process::ExitCode;
use std::sync::Arc;

use btcz_rpc::{RpcClient, SystemRunner};
use btcz_supervisor::{DaemonSupervisor, InstallationLocator, SupervisorTimings};
use clap::Parser;
use clap::error::ErrorKind;
use tracing::info;

mod cli;
mod commands;
mod config;
mod errors;
mod reporter;
mod shutdown;
mod tasks;
mod telemetry;

use cli::{Cli, Command};
use commands::{LogObserver, Streams};
use config::{ConfigLoader, OrthoConfigLoader, split_config_arguments};
use reporter::{ErrorReporter, Origin};
pub(crate) use errors::AppError;
pub use errors::{
    EXIT_COMMUNICATION_FAILURE, EXIT_INSTALLATION_NOT_FOUND, EXIT_SUCCESS, EXIT_UNEXPECTED,
    EXIT_UNRECOVERABLE,
};
use shutdown::{NeverRequested, ShutdownSignal, SystemShutdownSignal};

const RUNTIME_TARGET: &str = "btcz_cli::runtime";

/// Runs the CLI using the provided arguments and IO handles.
///
/// A panic anywhere in the run is caught and reported with
/// [`EXIT_UNRECOVERABLE`].
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let args: Vec<OsString> = args.into_iter().collect();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut io = Streams {
            stdout: &mut *stdout,
            stderr: &mut *stderr,
        };
        run_with_loader(&args, &mut io, &OrthoConfigLoader)
    }));
    outcome.unwrap_or_else(|_| {
        let _ = writeln!(stderr, "error: unrecoverable internal failure");
        ExitCode::from(EXIT_UNRECOVERABLE)
    })
}

/// Runs the CLI with a custom configuration loader.
pub(crate) fn run_with_loader<L: ConfigLoader>(
    args: &[OsString],
    io: &mut Streams<'_>,
    loader: &L,
) -> ExitCode {
    let split = split_config_arguments(args);
    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if matches!(error.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = write!(io.stdout, "{}", error.render());
            return ExitCode::from(EXIT_SUCCESS);
        }
        Err(error) => return report(&AppError::CliUsage(error), io.stderr),
    };

    let result = loader
        .load(&split.config_arguments)
        .and_then(|config| run_command(&cli.command, &config, io));
    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(error) => report(&error, io.stderr),
    }
}

fn run_command(
    command: &Command,
    config: &btcz_config::Config,
    io: &mut Streams<'_>,
) -> Result<(), AppError> {
    telemetry::initialise(config)?;
    let endpoint = InstallationLocator::from_config(config).locate()?;
    info!(
        target: RUNTIME_TARGET,
        daemon = %endpoint.daemon(),
        client = %endpoint.client(),
        network = %endpoint.network(),
        "installation located"
    );

    let client = RpcClient::new(SystemRunner, endpoint.client().as_str())
        .with_budget(config.rpc_timeout())
        .with_late_loading(config.late_loading(), config.poll_interval());
    let mut supervisor = DaemonSupervisor::new(endpoint, Arc::new(client))
        .with_timings(SupervisorTimings::with_poll_interval(config.poll_interval()))
        .with_observer(Arc::new(LogObserver));

    // Handlers go in before startup so an interrupt during a long load
    // cancels polling and the launched daemon is stopped again.
    let shutdown: Box<dyn ShutdownSignal> = match command {
        Command::Watch { .. } => {
            let signal = SystemShutdownSignal::install()?;
            supervisor = supervisor.with_cancellation(signal.flag());
            Box::new(signal)
        }
        _ => Box::new(NeverRequested),
    };
    commands::execute(command, &Arc::new(supervisor), shutdown.as_ref(), io)
}

fn report(error: &AppError, stderr: &mut dyn Write) -> ExitCode {
    let _ = match error {
        AppError::CliUsage(usage) => write!(stderr, "{}", usage.render()),
        other => ErrorReporter::default()
            .report(Origin::UserInitiated, other, stderr)
            .map(drop),
    };
    ExitCode::from(error.exit_code())
}

#[cfg(test)]
mod tests;

//! Command implementations.
//!
//! Every command writes its result to the stdout handle and leaves
//! diagnostics to tracing. Commands that need the wallet first make sure the
//! daemon is running and hold a shutdown guard for a daemon they launched.

mod render;
mod watch;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use btcz_rpc::{AddressKind, CommandRunner, RpcCall, RpcClient, RpcError, RpcOutcome, SendRequest};
use btcz_supervisor::{
    DaemonSupervisor, ShutdownGuard, StartupObserver, SupervisorError, SupervisorState,
};
use tracing::{debug, info};

use crate::AppError;
use crate::cli::Command;
use crate::shutdown::ShutdownSignal;

pub(crate) use watch::watch;

const COMMANDS_TARGET: &str = "btcz_cli::commands";

/// Output handles shared by every command.
pub(crate) struct Streams<'a> {
    pub(crate) stdout: &'a mut dyn Write,
    pub(crate) stderr: &'a mut dyn Write,
}

/// Forwards startup progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogObserver;

impl StartupObserver for LogObserver {
    fn state_changed(&self, state: SupervisorState) {
        debug!(target: COMMANDS_TARGET, %state, "daemon supervisor");
    }

    fn progress(&self, message: &str) {
        info!(target: COMMANDS_TARGET, message, "daemon loading");
    }
}

/// Runs one parsed command.
pub(crate) fn execute<R: CommandRunner + 'static>(
    command: &Command,
    supervisor: &Arc<DaemonSupervisor<R>>,
    shutdown: &dyn ShutdownSignal,
    io: &mut Streams<'_>,
) -> Result<(), AppError> {
    let client = supervisor.client();
    match command {
        Command::Status => status(supervisor, io.stdout),
        Command::Start => start(supervisor, io.stdout),
        Command::Stop => stop(client, io.stdout),
        Command::Call { method, args } => call(client, method, args, io.stdout),
        wallet_command => {
            let _guard = match attach(supervisor) {
                Err(AppError::Supervisor(SupervisorError::Cancelled { iterations })) => {
                    info!(target: COMMANDS_TARGET, iterations, "shutdown requested during startup");
                    return Ok(());
                }
                attached => attached?,
            };
            match wallet_command {
                Command::Balance => balance(client, io.stdout),
                Command::Addresses => addresses(client, io.stdout),
                Command::Transactions => transactions(client, io.stdout),
                Command::NewAddress { shielded } => new_address(client, *shielded, io.stdout),
                Command::Send {
                    from,
                    to,
                    amount,
                    memo,
                    fee,
                } => {
                    let request = SendRequest {
                        from: from.clone(),
                        to: to.clone(),
                        amount: amount.clone(),
                        memo: memo.clone(),
                        fee: fee.clone(),
                    };
                    send(client, &request, io.stdout)
                }
                Command::Operation { opid } => operation(client, opid, io.stdout),
                Command::Watch { interval_secs } => watch(
                    client,
                    Duration::from_secs((*interval_secs).max(1)),
                    shutdown,
                    io,
                ),
                Command::Status | Command::Start | Command::Stop | Command::Call { .. } => Ok(()),
            }
        }
    }
}

/// Makes sure the daemon is ready and returns a guard for a daemon this run
/// launched. A launched daemon is stopped again if it never became ready.
fn attach<R: CommandRunner>(
    supervisor: &Arc<DaemonSupervisor<R>>,
) -> Result<Option<ShutdownGuard<R>>, AppError> {
    let started = supervisor.ensure_running();
    let guard = supervisor.shutdown_guard();
    let report = started?;
    debug!(
        target: COMMANDS_TARGET,
        self_started = report.self_started,
        iterations = report.iterations,
        "daemon attached"
    );
    Ok(guard)
}

fn status<R: CommandRunner>(
    supervisor: &DaemonSupervisor<R>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let report = supervisor.status();
    let daemon = supervisor.client().daemon_info();
    render::status(&report, &daemon, out)?;
    Ok(())
}

fn start<R: CommandRunner>(
    supervisor: &DaemonSupervisor<R>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let report = supervisor.ensure_running()?;
    render::startup(&report, out)?;
    Ok(())
}

fn stop<R: CommandRunner>(client: &RpcClient<R>, out: &mut dyn Write) -> Result<(), AppError> {
    let raw = client.stop_daemon()?;
    match btcz_rpc::classify(&raw) {
        RpcOutcome::ConnectionFailure { .. } => writeln!(out, "daemon is not running")?,
        RpcOutcome::StructuredError { code, message } => {
            return Err(RpcError::Structured { code, message }.into());
        }
        _ => writeln!(out, "{}", raw.trim())?,
    }
    Ok(())
}

fn call<R: CommandRunner>(
    client: &RpcClient<R>,
    method: &str,
    args: &[String],
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let call = RpcCall::new(method).args(args.iter().cloned());
    match client.call(&call)? {
        RpcOutcome::Decoded(value) => {
            let text = serde_json::to_string_pretty(&value).map_err(AppError::Serialise)?;
            writeln!(out, "{text}")?;
        }
        // Some methods print bare text instead of JSON.
        RpcOutcome::ParseFailure { raw, .. } if !raw.to_ascii_lowercase().starts_with("error") => {
            writeln!(out, "{raw}")?;
        }
        other => {
            other.into_value()?;
        }
    }
    Ok(())
}

fn balance<R: CommandRunner>(client: &RpcClient<R>, out: &mut dyn Write) -> Result<(), AppError> {
    let balance = client.total_balance()?;
    render::balance(&balance, out)?;
    Ok(())
}

fn addresses<R: CommandRunner>(
    client: &RpcClient<R>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    for address in client.transparent_addresses()? {
        let balance = client.balance_for_address(&address, false)?;
        writeln!(out, "{address}  {balance}")?;
    }
    for shielded in client.shielded_addresses()? {
        let balance = client.balance_for_address(&shielded.address, false)?;
        let marker = if shielded.viewing_key_only {
            "  (watch-only)"
        } else {
            ""
        };
        writeln!(out, "{}  {balance}{marker}", shielded.address)?;
    }
    Ok(())
}

fn transactions<R: CommandRunner>(
    client: &RpcClient<R>,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    for record in client.public_transactions()? {
        render::transaction(&record, out)?;
    }
    for shielded in client.shielded_addresses()? {
        for note in client.received_by_shielded_address(&shielded.address)? {
            render::received_note(&shielded.address, &note, out)?;
        }
    }
    Ok(())
}

fn new_address<R: CommandRunner>(
    client: &RpcClient<R>,
    shielded: bool,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let kind = if shielded {
        AddressKind::Shielded
    } else {
        AddressKind::Transparent
    };
    writeln!(out, "{}", client.new_address(kind)?)?;
    Ok(())
}

fn send<R: CommandRunner>(
    client: &RpcClient<R>,
    request: &SendRequest,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let operation_id = client.send_cash(request)?;
    writeln!(out, "{operation_id}")?;
    Ok(())
}

fn operation<R: CommandRunner>(
    client: &RpcClient<R>,
    operation_id: &str,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let status = client.operation_status(operation_id)?;
    render::operation(&status, out)?;
    Ok(())
}

#[cfg(test)]
mod tests;

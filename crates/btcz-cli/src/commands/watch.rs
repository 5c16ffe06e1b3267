//! Periodic balance and network refresh.
//!
//! Each refresh runs as its own [`RefreshTask`] and posts a [`WatchEvent`]
//! back to the command thread, which owns the output streams. Failures go
//! through an [`ErrorReporter`] so a daemon that keeps failing does not flood
//! the terminal.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use btcz_rpc::{CommandRunner, NetworkInfo, RpcClient, RpcError, WalletBalance};
use tracing::{debug, info};

use super::{Streams, render};
use crate::AppError;
use crate::reporter::{ErrorReporter, Origin};
use crate::shutdown::ShutdownSignal;
use crate::tasks::{RefreshTask, Stoppable};

const WATCH_TARGET: &str = "btcz_cli::watch";

/// How often the command thread checks for a shutdown request.
const PUMP_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum WatchEvent {
    Balance(WalletBalance),
    Network(NetworkInfo),
    Failed {
        task: &'static str,
        error: RpcError,
    },
}

/// Refreshes balances and network state every `interval` until a shutdown is
/// requested.
pub(crate) fn watch<R: CommandRunner + 'static>(
    client: &Arc<RpcClient<R>>,
    interval: Duration,
    shutdown: &dyn ShutdownSignal,
    io: &mut Streams<'_>,
) -> Result<(), AppError> {
    let (events, received) = mpsc::channel();
    let mut tasks = spawn_refresh(client, interval, &events)?;
    drop(events);
    info!(target: WATCH_TARGET, interval_ms = interval.as_millis(), "watching wallet");

    let mut reporter = ErrorReporter::default();
    let outcome = pump(&received, shutdown, &mut reporter, io);
    for task in &mut tasks {
        debug!(target: WATCH_TARGET, task = task.name(), "stopping refresh task");
        task.stop();
    }
    outcome
}

fn spawn_refresh<R: CommandRunner + 'static>(
    client: &Arc<RpcClient<R>>,
    interval: Duration,
    events: &Sender<WatchEvent>,
) -> Result<Vec<RefreshTask>, AppError> {
    let balance = {
        let client = Arc::clone(client);
        let events = events.clone();
        spawn_task("balance", interval, move || {
            let event = match client.total_balance() {
                Ok(balance) => WatchEvent::Balance(balance),
                Err(error) => WatchEvent::Failed {
                    task: "balance",
                    error,
                },
            };
            post(&events, event);
        })?
    };
    let network = {
        let client = Arc::clone(client);
        let events = events.clone();
        spawn_task("network", interval, move || {
            let event = match client.network_info() {
                Ok(info) => WatchEvent::Network(info),
                Err(error) => WatchEvent::Failed {
                    task: "network",
                    error,
                },
            };
            post(&events, event);
        })?
    };
    Ok(vec![balance, network])
}

fn spawn_task<F>(task: &'static str, interval: Duration, tick: F) -> Result<RefreshTask, AppError>
where
    F: FnMut() + Send + 'static,
{
    RefreshTask::spawn(task, interval, tick).map_err(|source| AppError::SpawnTask { task, source })
}

fn post(events: &Sender<WatchEvent>, event: WatchEvent) {
    if events.send(event).is_err() {
        debug!(target: WATCH_TARGET, "watch output closed");
    }
}

fn pump(
    received: &Receiver<WatchEvent>,
    shutdown: &dyn ShutdownSignal,
    reporter: &mut ErrorReporter,
    io: &mut Streams<'_>,
) -> Result<(), AppError> {
    loop {
        if shutdown.requested() {
            info!(target: WATCH_TARGET, "shutdown requested");
            return Ok(());
        }
        match received.recv_timeout(PUMP_INTERVAL) {
            Ok(WatchEvent::Balance(balance)) => render::balance(&balance, io.stdout)?,
            Ok(WatchEvent::Network(info)) => render::network(&info, io.stdout)?,
            Ok(WatchEvent::Failed { task, error }) => {
                reporter.report(
                    Origin::Background,
                    &format_args!("{task} refresh failed: {error}"),
                    io.stderr,
                )?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}

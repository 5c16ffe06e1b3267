//! Daemon lifecycle management.
//!
//! [`DaemonSupervisor`] makes sure a daemon is answering before the wallet is
//! used. It probes for a running daemon, launches one when nothing listens,
//! polls until loading has finished, and stops the daemon again on shutdown
//! when, and only when, it launched it itself.
//!
//! ```text
//! Idle -> Probing -> AlreadyRunning -> Polling -> Ready
//!                 \-> Starting ------/        \-> Failed
//! ```

mod monitoring;
mod observer;
mod shutdown;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use btcz_rpc::{CommandRunner, ProcessHandle, RpcClient};
use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::locator::Endpoint;
use crate::probe::{DaemonState, ProcessStatusProbe};

pub use observer::{
    NoopObserver, ObservedEvent, RecordingObserver, StartupObserver, SupervisorState,
};
pub use shutdown::{ShutdownGuard, StopOutcome};

use self::monitoring::{ProbeReading, read_probe};

/// Tracing target for supervisor operations.
const SUPERVISOR_TARGET: &str = "btcz_supervisor::supervisor";

/// Intervals and budgets governing startup polling and shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorTimings {
    /// Delay between startup probes.
    pub poll_interval: Duration,
    /// Unreachable probes tolerated before startup fails.
    pub tolerated_connection_failures: u32,
    /// Window in which a stopping daemon is expected to exit.
    pub liveness_check: Duration,
    /// Time after the first stop request when termination is forced.
    pub escalate_after: Duration,
    /// Time after the first stop request when shutdown is abandoned.
    pub give_up_after: Duration,
    /// Interval between liveness samples within a check window.
    pub liveness_sample: Duration,
}

impl Default for SupervisorTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1200),
            tolerated_connection_failures: 4,
            liveness_check: Duration::from_secs(3),
            escalate_after: Duration::from_secs(10),
            give_up_after: Duration::from_secs(60),
            liveness_sample: Duration::from_millis(100),
        }
    }
}

impl SupervisorTimings {
    /// Default timings with a custom poll interval.
    #[must_use]
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Self::default()
        }
    }

    /// Default budgets with every delay set to zero.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            liveness_check: Duration::ZERO,
            escalate_after: Duration::ZERO,
            give_up_after: Duration::ZERO,
            liveness_sample: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Summary of a successful [`DaemonSupervisor::ensure_running`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    /// True when this supervisor launched the daemon.
    pub self_started: bool,
    /// Readiness probes issued while polling.
    pub iterations: u32,
    /// Last progress message reported while loading.
    pub last_message: Option<String>,
    /// Time from the first probe to readiness.
    pub elapsed: Duration,
}

/// Supervisor state combined with the process listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonStatusReport {
    /// Current supervisor state.
    pub state: SupervisorState,
    /// True when this supervisor launched the daemon.
    pub self_started: bool,
    /// Identifier of the launched daemon, if any.
    pub pid: Option<u32>,
    /// What the process listing says about the daemon.
    pub process: DaemonState,
}

#[derive(Debug)]
struct Inner {
    state: SupervisorState,
    process: Option<Box<dyn ProcessHandle>>,
    self_started: bool,
    pid: Option<u32>,
    report: Option<StartupReport>,
}

/// Starts, watches, and stops the daemon.
pub struct DaemonSupervisor<R> {
    endpoint: Endpoint,
    client: Arc<RpcClient<R>>,
    timings: SupervisorTimings,
    observer: Arc<dyn StartupObserver>,
    cancel: Arc<AtomicBool>,
    inner: Mutex<Inner>,
    startup: Mutex<()>,
}

impl<R> std::fmt::Debug for DaemonSupervisor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonSupervisor")
            .field("endpoint", &self.endpoint)
            .field("timings", &self.timings)
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner> DaemonSupervisor<R> {
    /// Creates an idle supervisor for `endpoint` that talks through `client`.
    #[must_use]
    pub fn new(endpoint: Endpoint, client: Arc<RpcClient<R>>) -> Self {
        Self {
            endpoint,
            client,
            timings: SupervisorTimings::default(),
            observer: Arc::new(NoopObserver),
            cancel: Arc::new(AtomicBool::new(false)),
            inner: Mutex::new(Inner {
                state: SupervisorState::Idle,
                process: None,
                self_started: false,
                pid: None,
                report: None,
            }),
            startup: Mutex::new(()),
        }
    }

    /// Overrides the polling and shutdown timings.
    #[must_use]
    pub const fn with_timings(mut self, timings: SupervisorTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Registers an observer for transitions and progress messages.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn StartupObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Abandons readiness polling once `flag` is raised.
    ///
    /// Signal handlers can share the flag so an interrupt during a long
    /// load ends startup instead of being ignored.
    #[must_use]
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Resolved installation this supervisor manages.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Shared RPC client.
    #[must_use]
    pub const fn client(&self) -> &Arc<RpcClient<R>> {
        &self.client
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SupervisorState {
        self.lock().state
    }

    /// True when this supervisor launched the daemon it manages.
    #[must_use]
    pub fn is_self_started(&self) -> bool {
        self.lock().self_started
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, state: SupervisorState) {
        let previous = {
            let mut inner = self.lock();
            std::mem::replace(&mut inner.state, state)
        };
        debug!(
            target: SUPERVISOR_TARGET,
            from = %previous,
            to = %state,
            "supervisor transition"
        );
        self.observer.state_changed(state);
    }

    fn fail(&self, error: SupervisorError) -> SupervisorError {
        self.transition(SupervisorState::Failed);
        error
    }

    /// Makes sure a daemon is running and has finished loading.
    ///
    /// A daemon that already answers is adopted; otherwise one is launched
    /// and marked as self-started. A daemon launched by an earlier failed
    /// call that is still alive is polled again instead of launched twice. Once ready, later calls return the same
    /// report without probing again.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Launch`] if the daemon cannot be started,
    /// [`SupervisorError::NotReady`] if it stays unreachable beyond the
    /// tolerated number of probes, [`SupervisorError::DaemonExited`] if a
    /// launched daemon dies while loading, [`SupervisorError::Cancelled`] if
    /// the cancellation flag is raised while polling, and
    /// [`SupervisorError::Rpc`] if the client itself cannot be run.
    pub fn ensure_running(&self) -> Result<StartupReport, SupervisorError> {
        let _startup = self.startup.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(report) = self.lock().report.clone() {
            return Ok(report);
        }

        let started_at = Instant::now();
        self.transition(SupervisorState::Probing);
        let reading = read_probe(&self.client).map_err(|error| self.fail(error.into()))?;

        let self_started = if self.owns_live_daemon() {
            info!(target: SUPERVISOR_TARGET, "resuming startup of launched daemon");
            true
        } else if matches!(reading, ProbeReading::Unreachable(_)) {
            self.transition(SupervisorState::Starting);
            self.launch()?;
            true
        } else {
            info!(target: SUPERVISOR_TARGET, "adopting running daemon");
            self.transition(SupervisorState::AlreadyRunning);
            false
        };

        let report = self.wait_for_startup(started_at, self_started)?;
        self.lock().report = Some(report.clone());
        Ok(report)
    }

    /// True when a daemon this supervisor launched is still alive.
    ///
    /// A handle whose daemon has gone, or whose liveness is unknown, is
    /// terminated and released so the next launch starts clean.
    fn owns_live_daemon(&self) -> bool {
        let mut inner = self.lock();
        let Some(process) = inner.process.as_mut() else {
            return false;
        };
        match process.is_alive() {
            Ok(true) => return true,
            Ok(false) => debug!(target: SUPERVISOR_TARGET, "launched daemon has exited"),
            Err(error) => {
                warn!(target: SUPERVISOR_TARGET, %error, "cannot check launched daemon");
                if let Err(error) = process.terminate() {
                    warn!(target: SUPERVISOR_TARGET, %error, "cannot terminate stale daemon");
                }
            }
        }
        inner.process = None;
        inner.self_started = false;
        inner.pid = None;
        false
    }

    fn launch(&self) -> Result<(), SupervisorError> {
        let argv = self.endpoint.daemon_launch_argv();
        let handle = self
            .client
            .runner()
            .start_detached(&argv)
            .map_err(|source| {
                self.fail(SupervisorError::Launch {
                    program: self.endpoint.daemon().to_string(),
                    source,
                })
            })?;
        let pid = handle.id();
        info!(
            target: SUPERVISOR_TARGET,
            pid,
            daemon = %self.endpoint.daemon(),
            "launched daemon"
        );
        let mut inner = self.lock();
        inner.process = Some(handle);
        inner.self_started = true;
        inner.pid = Some(pid);
        Ok(())
    }

    /// Supervisor state combined with the process listing.
    #[must_use]
    pub fn status(&self) -> DaemonStatusReport {
        let process = ProcessStatusProbe::new(self.client.runner())
            .probe(self.endpoint.daemon_process_name());
        let inner = self.lock();
        DaemonStatusReport {
            state: inner.state,
            self_started: inner.self_started,
            pid: inner.pid,
            process,
        }
    }

    /// Returns a guard that stops the daemon when dropped, or `None` when the
    /// daemon was not launched by this supervisor.
    #[must_use]
    pub fn shutdown_guard(self: &Arc<Self>) -> Option<ShutdownGuard<R>> {
        self.is_self_started()
            .then(|| ShutdownGuard::new(Arc::clone(self)))
    }
}

#[cfg(test)]
mod shutdown_tests;

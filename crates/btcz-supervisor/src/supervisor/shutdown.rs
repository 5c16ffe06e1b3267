//! Best-effort shutdown of a self-started daemon.
//!
//! Shutdown asks the daemon to stop, samples its liveness, escalates to a
//! forced termination once [`SupervisorTimings::escalate_after`] has passed,
//! and gives up with a warning after [`SupervisorTimings::give_up_after`].
//! None of these steps can fail the caller.
//!
//! [`SupervisorTimings::escalate_after`]: super::SupervisorTimings::escalate_after
//! [`SupervisorTimings::give_up_after`]: super::SupervisorTimings::give_up_after

use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use btcz_rpc::{CommandRunner, ProcessHandle};
use tracing::{debug, info, warn};

use super::{DaemonSupervisor, SupervisorState};

const SHUTDOWN_TARGET: &str = "btcz_supervisor::shutdown";

/// Result of [`DaemonSupervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// This supervisor did not launch the daemon, or already stopped it.
    NotOwned,
    /// The daemon exited after the stop request.
    Stopped,
    /// The daemon exited after forced termination.
    Terminated,
    /// The daemon was still alive when shutdown was abandoned.
    StillAlive,
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotOwned => "not owned",
            Self::Stopped => "stopped",
            Self::Terminated => "terminated",
            Self::StillAlive => "still alive",
        };
        f.write_str(text)
    }
}

impl<R: CommandRunner> DaemonSupervisor<R> {
    /// Stops the daemon if this supervisor launched it.
    ///
    /// The process handle is taken on the first call, so later calls return
    /// [`StopOutcome::NotOwned`] without touching the daemon.
    pub fn stop(&self) -> StopOutcome {
        let Some(mut process) = self.take_process() else {
            debug!(target: SHUTDOWN_TARGET, "daemon not owned, leaving it running");
            return StopOutcome::NotOwned;
        };

        let pid = process.id();
        info!(target: SHUTDOWN_TARGET, pid, "stopping daemon");
        let started = Instant::now();
        self.request_stop();

        let mut escalated = false;
        let outcome = loop {
            if self.wait_for_exit(process.as_mut()) {
                break if escalated {
                    StopOutcome::Terminated
                } else {
                    StopOutcome::Stopped
                };
            }
            let elapsed = started.elapsed();
            if !escalated && elapsed >= self.timings.escalate_after {
                warn!(target: SHUTDOWN_TARGET, pid, "daemon ignored stop, terminating");
                self.request_stop();
                if let Err(error) = process.terminate() {
                    warn!(target: SHUTDOWN_TARGET, pid, %error, "termination failed");
                }
                escalated = true;
                continue;
            }
            if elapsed >= self.timings.give_up_after {
                warn!(
                    target: SHUTDOWN_TARGET,
                    pid,
                    elapsed_ms = elapsed.as_millis(),
                    "daemon still alive, giving up"
                );
                break StopOutcome::StillAlive;
            }
        };

        info!(target: SHUTDOWN_TARGET, pid, ?outcome, "daemon shutdown finished");
        self.transition(SupervisorState::Idle);
        outcome
    }

    fn take_process(&self) -> Option<Box<dyn ProcessHandle>> {
        let mut inner = self.lock();
        let process = inner.process.take()?;
        inner.self_started = false;
        inner.pid = None;
        inner.report = None;
        Some(process)
    }

    fn request_stop(&self) {
        match self.client.stop_daemon() {
            Ok(response) => debug!(target: SHUTDOWN_TARGET, %response, "stop requested"),
            Err(error) => warn!(target: SHUTDOWN_TARGET, %error, "stop request failed"),
        }
    }

    /// Samples liveness for one check window. Returns true once the process
    /// has exited.
    fn wait_for_exit(&self, process: &mut dyn ProcessHandle) -> bool {
        let deadline = Instant::now() + self.timings.liveness_check;
        loop {
            match process.is_alive() {
                Ok(false) => return true,
                Ok(true) => {}
                Err(error) => {
                    warn!(target: SHUTDOWN_TARGET, %error, "cannot check daemon liveness");
                }
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(self.timings.liveness_sample.min(deadline - now));
        }
    }
}

/// Stops a self-started daemon when dropped.
///
/// Obtained from [`DaemonSupervisor::shutdown_guard`].
#[derive(Debug)]
pub struct ShutdownGuard<R: CommandRunner> {
    supervisor: Arc<DaemonSupervisor<R>>,
}

impl<R: CommandRunner> ShutdownGuard<R> {
    pub(super) const fn new(supervisor: Arc<DaemonSupervisor<R>>) -> Self {
        Self { supervisor }
    }

    /// Supervisor whose daemon this guard stops.
    #[must_use]
    pub const fn supervisor(&self) -> &Arc<DaemonSupervisor<R>> {
        &self.supervisor
    }
}

impl<R: CommandRunner> Drop for ShutdownGuard<R> {
    fn drop(&mut self) {
        let outcome = self.supervisor.stop();
        debug!(target: SHUTDOWN_TARGET, ?outcome, "shutdown guard released");
    }
}

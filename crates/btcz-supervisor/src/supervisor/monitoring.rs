//! Readiness polling.
//!
//! Every probe issues `getinfo` and reduces the outcome to a [`ProbeReading`].
//! Unreachable or unclear readings are tolerated for a bounded number of
//! iterations; the loading error (-28) is tolerated indefinitely and its
//! message is forwarded to the observer.

use std::thread;
use std::time::Instant;

use btcz_rpc::{CommandRunner, RpcCall, RpcClient, RpcError, RpcOutcome, RunnerError};
use tracing::{debug, info, warn};

use super::{DaemonSupervisor, StartupReport, SupervisorState};
use crate::error::SupervisorError;

const MONITOR_TARGET: &str = "btcz_supervisor::monitoring";

/// Method used to check whether the daemon answers.
const PROBE_METHOD: &str = "getinfo";

/// Reduced result of one readiness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ProbeReading {
    /// The daemon answered, with a value or with an error other than loading.
    Answered,
    /// The daemon is loading and reported this progress message.
    Loading(String),
    /// Nothing is listening.
    Unreachable(String),
    /// The response could not be interpreted or the client overran its budget.
    Unclear(String),
}

impl From<RpcOutcome> for ProbeReading {
    fn from(outcome: RpcOutcome) -> Self {
        let loading = outcome.is_loading();
        match outcome {
            RpcOutcome::StructuredError { message, .. } if loading => Self::Loading(message),
            RpcOutcome::Decoded(_) | RpcOutcome::StructuredError { .. } => Self::Answered,
            RpcOutcome::ConnectionFailure { raw } => Self::Unreachable(raw),
            RpcOutcome::ParseFailure { raw, .. } => Self::Unclear(raw),
        }
    }
}

/// Issues one readiness probe.
///
/// Client launch failures and I/O errors are returned as errors; everything
/// the daemon could have caused is folded into the reading.
pub(super) fn read_probe<R: CommandRunner>(
    client: &RpcClient<R>,
) -> Result<ProbeReading, RpcError> {
    match client.call(&RpcCall::new(PROBE_METHOD)) {
        Ok(outcome) => Ok(ProbeReading::from(outcome)),
        Err(RpcError::Runner(error @ RunnerError::Timeout { .. })) => {
            Ok(ProbeReading::Unclear(error.to_string()))
        }
        Err(error) => Err(error),
    }
}

#[derive(Debug, Default)]
struct PollState {
    iterations: u32,
    last_message: Option<String>,
}

impl<R: CommandRunner> DaemonSupervisor<R> {
    /// Polls until the daemon answers, fails, or exits.
    ///
    /// Every poll waits one `poll_interval` first so a freshly launched
    /// daemon gets time to open its RPC port.
    pub(super) fn wait_for_startup(
        &self,
        started_at: Instant,
        self_started: bool,
    ) -> Result<StartupReport, SupervisorError> {
        self.transition(SupervisorState::Polling);
        let mut poll = PollState::default();
        loop {
            thread::sleep(self.timings.poll_interval);
            if self.cancelled() {
                info!(
                    target: MONITOR_TARGET,
                    iterations = poll.iterations,
                    "startup cancelled"
                );
                return Err(self.fail(SupervisorError::Cancelled {
                    iterations: poll.iterations,
                }));
            }
            if self_started && self.daemon_exited() {
                warn!(
                    target: MONITOR_TARGET,
                    iterations = poll.iterations,
                    "daemon exited while loading"
                );
                return Err(self.fail(SupervisorError::DaemonExited {
                    iterations: poll.iterations,
                }));
            }

            poll.iterations += 1;
            let reading = read_probe(&self.client).map_err(|error| self.fail(error.into()))?;
            match reading {
                ProbeReading::Answered => {
                    let report = StartupReport {
                        self_started,
                        iterations: poll.iterations,
                        last_message: poll.last_message,
                        elapsed: started_at.elapsed(),
                    };
                    info!(
                        target: MONITOR_TARGET,
                        iterations = report.iterations,
                        elapsed_ms = report.elapsed.as_millis(),
                        "daemon ready"
                    );
                    self.transition(SupervisorState::Ready);
                    return Ok(report);
                }
                ProbeReading::Loading(message) => {
                    debug!(target: MONITOR_TARGET, %message, "daemon loading");
                    self.observer.progress(&message);
                    poll.last_message = Some(message);
                }
                ProbeReading::Unreachable(raw) | ProbeReading::Unclear(raw) => {
                    if poll.iterations > self.timings.tolerated_connection_failures {
                        return Err(self.fail(SupervisorError::NotReady {
                            iterations: poll.iterations,
                            last_message: poll.last_message,
                            last_response: raw,
                        }));
                    }
                    debug!(
                        target: MONITOR_TARGET,
                        iteration = poll.iterations,
                        response = %raw,
                        "daemon not answering yet"
                    );
                }
            }
        }
    }

    /// True when the launched daemon is known to have exited.
    fn daemon_exited(&self) -> bool {
        let mut inner = self.lock();
        let Some(process) = inner.process.as_mut() else {
            return false;
        };
        match process.is_alive() {
            Ok(alive) => !alive,
            Err(error) => {
                warn!(target: MONITOR_TARGET, %error, "cannot check daemon liveness");
                false
            }
        }
    }
}

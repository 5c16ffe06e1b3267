//! Scripted test doubles for [`CommandRunner`] and [`ProcessHandle`].
//!
//! [`ScriptedRunner`] answers client invocations from a queue of canned
//! responses and records every argument vector it sees. Detached launches
//! hand out clones of a shared [`FakeProcess`] whose liveness tests can
//! inspect and steer.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::RunnerError;
use crate::process::{CommandOutput, CommandRunner, ProcessHandle};

/// Response printed by the client when no daemon is listening.
pub const CONNECTION_REFUSED: &str = "error: couldn't connect to server";

/// Process identifier reported by [`FakeProcess`].
pub const FAKE_PID: u32 = 4242;

#[derive(Debug)]
struct FakeState {
    alive: bool,
    exits_on_stop: bool,
    survives_terminate: bool,
    terminations: usize,
}

/// Shared, steerable stand-in for a spawned daemon.
#[derive(Debug, Clone)]
pub struct FakeProcess {
    state: Arc<Mutex<FakeState>>,
}

impl Default for FakeProcess {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                alive: true,
                exits_on_stop: true,
                survives_terminate: false,
                terminations: 0,
            })),
        }
    }
}

impl FakeProcess {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the process is still running.
    #[must_use]
    pub fn alive(&self) -> bool {
        self.state().alive
    }

    /// Marks the process as exited.
    pub fn exit(&self) {
        self.state().alive = false;
    }

    /// Makes the process ignore the `stop` RPC method.
    pub fn ignore_stop(&self) {
        self.state().exits_on_stop = false;
    }

    /// Makes the process survive forced termination.
    pub fn survive_terminate(&self) {
        self.state().survives_terminate = true;
    }

    /// Number of forced terminations requested.
    #[must_use]
    pub fn terminations(&self) -> usize {
        self.state().terminations
    }

    fn observe_stop(&self) {
        let mut state = self.state();
        if state.exits_on_stop {
            state.alive = false;
        }
    }
}

impl ProcessHandle for FakeProcess {
    fn id(&self) -> u32 {
        FAKE_PID
    }

    fn is_alive(&mut self) -> Result<bool, RunnerError> {
        Ok(self.alive())
    }

    fn terminate(&mut self) -> Result<(), RunnerError> {
        let mut state = self.state();
        state.terminations += 1;
        if !state.survives_terminate {
            state.alive = false;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<CommandOutput, RunnerError>>,
    fallback: Option<String>,
    calls: Vec<Vec<String>>,
    budgets: Vec<Duration>,
    spawns: Vec<Vec<String>>,
    fail_spawns: bool,
}

/// [`CommandRunner`] that replays queued responses.
///
/// When the queue is empty the fallback response is returned, or
/// [`CONNECTION_REFUSED`] if none was set.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRunner {
    script: Arc<Mutex<Script>>,
    process: FakeProcess,
}

impl ScriptedRunner {
    /// Creates a runner with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues a successful response.
    pub fn respond(&self, text: impl Into<String>) -> &Self {
        self.script()
            .responses
            .push_back(Ok(CommandOutput::success(text)));
        self
    }

    /// Queues `count` connection-refused responses.
    pub fn refuse_connections(&self, count: usize) -> &Self {
        for _ in 0..count {
            self.script().responses.push_back(Ok(CommandOutput {
                text: CONNECTION_REFUSED.to_owned(),
                exit_code: Some(1),
            }));
        }
        self
    }

    /// Queues a runner failure.
    pub fn fail_with(&self, error: RunnerError) -> &Self {
        self.script().responses.push_back(Err(error));
        self
    }

    /// Queues a client launch failure.
    pub fn fail_to_launch(&self) -> &Self {
        self.fail_with(RunnerError::Spawn {
            program: String::from("bitcoinz-cli"),
            source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
        })
    }

    /// Sets the response used once the queue is exhausted.
    pub fn fallback(&self, text: impl Into<String>) -> &Self {
        self.script().fallback = Some(text.into());
        self
    }

    /// Makes every detached launch fail.
    pub fn fail_spawns(&self) -> &Self {
        self.script().fail_spawns = true;
        self
    }

    /// Every argument vector passed to [`CommandRunner::execute`].
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.script().calls.clone()
    }

    /// Method names of every executed call, in order.
    #[must_use]
    pub fn methods(&self) -> Vec<String> {
        self.script()
            .calls
            .iter()
            .filter_map(|argv| method_of(argv).map(str::to_owned))
            .collect()
    }

    /// Budgets passed with every executed call.
    #[must_use]
    pub fn budgets(&self) -> Vec<Duration> {
        self.script().budgets.clone()
    }

    /// Every argument vector passed to [`CommandRunner::start_detached`].
    #[must_use]
    pub fn spawned(&self) -> Vec<Vec<String>> {
        self.script().spawns.clone()
    }

    /// Number of detached launches attempted.
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.script().spawns.len()
    }

    /// Process handed out by detached launches.
    #[must_use]
    pub fn process(&self) -> FakeProcess {
        self.process.clone()
    }
}

/// First argument after the program that is not a `-flag`.
fn method_of(argv: &[String]) -> Option<&str> {
    argv.iter()
        .skip(1)
        .find(|arg| !arg.starts_with('-'))
        .map(String::as_str)
}

impl CommandRunner for ScriptedRunner {
    fn execute(&self, argv: &[String], budget: Duration) -> Result<CommandOutput, RunnerError> {
        if argv.is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        if method_of(argv) == Some("stop") {
            self.process.observe_stop();
        }
        let mut script = self.script();
        script.calls.push(argv.to_vec());
        script.budgets.push(budget);
        match script.responses.pop_front() {
            Some(response) => response,
            None => {
                let text = script
                    .fallback
                    .clone()
                    .unwrap_or_else(|| CONNECTION_REFUSED.to_owned());
                Ok(CommandOutput::success(text))
            }
        }
    }

    fn start_detached(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>, RunnerError> {
        let mut script = self.script();
        script.spawns.push(argv.to_vec());
        if script.fail_spawns {
            return Err(RunnerError::Spawn {
                program: argv.first().cloned().unwrap_or_default(),
                source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
            });
        }
        Ok(Box::new(self.process.clone()))
    }
}

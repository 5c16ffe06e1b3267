//! Running external programs on behalf of the wallet.
//!
//! [`CommandRunner`] is the seam between the RPC layer and the operating
//! system. [`SystemRunner`] implements it with `std::process`: short-lived
//! client invocations have their stdout and stderr captured and merged, and
//! long-lived daemons are started detached and returned as a
//! [`ProcessHandle`] that can be polled and killed.

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::RunnerError;

/// Tracing target for subprocess operations.
const PROCESS_TARGET: &str = "btcz_rpc::process";

/// Interval between exit checks while a captured command runs.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Text and exit outcome of a completed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output followed by standard error, trailing newlines removed.
    pub text: String,
    /// Exit code, or `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Builds output for a process that exited successfully.
    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: Some(0),
        }
    }
}

/// A spawned long-lived process.
pub trait ProcessHandle: Send + fmt::Debug {
    /// Operating system process identifier.
    fn id(&self) -> u32;

    /// Returns true while the process has not exited.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Io`] if the process state cannot be queried.
    fn is_alive(&mut self) -> Result<bool, RunnerError>;

    /// Forcibly terminates the process and reaps it.
    ///
    /// Terminating a process that already exited succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Io`] if the kill signal cannot be delivered.
    fn terminate(&mut self) -> Result<(), RunnerError>;
}

/// Launches external programs.
///
/// The first element of every argument vector is the program path; the rest
/// are passed as discrete arguments.
pub trait CommandRunner: Send + Sync {
    /// Runs a program to completion and returns its merged output.
    ///
    /// The child is killed if it has not exited within `budget`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the program cannot be started and
    /// [`RunnerError::Timeout`] if it overruns its budget.
    fn execute(&self, argv: &[String], budget: Duration) -> Result<CommandOutput, RunnerError>;

    /// Starts a program without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the program cannot be started.
    fn start_detached(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>, RunnerError>;
}

/// [`CommandRunner`] backed by the host operating system.
///
/// On Windows the arguments are appended to the command line verbatim, so
/// callers are expected to quote them (see
/// [`ArgumentStyle::WindowsQuoted`](crate::ArgumentStyle::WindowsQuoted)).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, argv: &[String], budget: Duration) -> Result<CommandOutput, RunnerError> {
        let (program, rest) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;
        let mut command = build_command(program, rest);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            target: PROCESS_TARGET,
            program = %program,
            arg_count = rest.len(),
            "running command"
        );

        let mut child = command.spawn().map_err(|source| spawn_error(program, source))?;
        let stdout = capture(child.stdout.take());
        let stderr = capture(child.stderr.take());
        let status = wait_with_budget(program, &mut child, budget)?;

        let mut text = collect(stdout);
        text.push_str(&collect(stderr));
        let text = text.trim_end_matches(['\r', '\n']).to_owned();

        debug!(
            target: PROCESS_TARGET,
            program = %program,
            exit_code = ?status.code(),
            output_bytes = text.len(),
            "command finished"
        );

        Ok(CommandOutput {
            text,
            exit_code: status.code(),
        })
    }

    fn start_detached(&self, argv: &[String]) -> Result<Box<dyn ProcessHandle>, RunnerError> {
        let (program, rest) = argv.split_first().ok_or(RunnerError::EmptyCommand)?;
        let mut command = build_command(program, rest);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|source| spawn_error(program, source))?;
        debug!(
            target: PROCESS_TARGET,
            program = %program,
            pid = child.id(),
            "started detached process"
        );
        Ok(Box::new(SystemProcess {
            program: program.clone(),
            child,
        }))
    }
}

#[cfg(windows)]
fn build_command(program: &str, args: &[String]) -> Command {
    use std::os::windows::process::CommandExt;

    let mut command = Command::new(program);
    for arg in args {
        command.raw_arg(arg);
    }
    command
}

#[cfg(not(windows))]
fn build_command(program: &str, args: &[String]) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    command
}

fn spawn_error(program: &str, source: io::Error) -> RunnerError {
    RunnerError::Spawn {
        program: program.to_owned(),
        source: Arc::new(source),
    }
}

/// Reads a pipe to the end on a helper thread so neither stream can fill up
/// and stall the child.
fn capture<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut reader) = pipe {
            drop(reader.read_to_end(&mut bytes));
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn collect(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

fn wait_with_budget(
    program: &str,
    child: &mut Child,
    budget: Duration,
) -> Result<ExitStatus, RunnerError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if start.elapsed() > budget => {
                let budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    target: PROCESS_TARGET,
                    program = %program,
                    budget_ms,
                    "command overran its budget, killing process"
                );
                drop(child.kill());
                drop(child.wait());
                return Err(RunnerError::Timeout {
                    program: program.to_owned(),
                    budget_ms,
                });
            }
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(source) => {
                return Err(RunnerError::Io {
                    program: program.to_owned(),
                    source: Arc::new(source),
                });
            }
        }
    }
}

/// Handle to a process started by [`SystemRunner::start_detached`].
///
/// Dropping the handle leaves the process running.
#[derive(Debug)]
pub struct SystemProcess {
    program: String,
    child: Child,
}

impl SystemProcess {
    fn io_error(&self, source: io::Error) -> RunnerError {
        RunnerError::Io {
            program: self.program.clone(),
            source: Arc::new(source),
        }
    }
}

impl ProcessHandle for SystemProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> Result<bool, RunnerError> {
        match self.child.try_wait() {
            Ok(status) => Ok(status.is_none()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn terminate(&mut self) -> Result<(), RunnerError> {
        if !self.is_alive()? {
            return Ok(());
        }
        if let Err(source) = self.child.kill() {
            // The process may have exited between the check and the kill.
            if source.kind() != io::ErrorKind::InvalidInput {
                return Err(self.io_error(source));
            }
        }
        self.child
            .wait()
            .map(|status| {
                debug!(
                    target: PROCESS_TARGET,
                    program = %self.program,
                    ?status,
                    "terminated process"
                );
            })
            .map_err(|source| self.io_error(source))
    }
}

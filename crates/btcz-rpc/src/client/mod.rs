//! Invoking daemon methods through the command-line client.
//!
//! [`RpcClient`] runs one client process per call, classifies its output and
//! offers shape-checked entry points. Calls are serialised through an internal
//! lock so at most one client process runs at a time.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use btcz_config::LateLoadingPolicy;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::call::{ArgumentStyle, RpcCall};
use crate::classify::{JsonShape, RpcOutcome, classify};
use crate::error::RpcError;
use crate::process::CommandRunner;

/// Tracing target for client invocations.
const RPC_TARGET: &str = "btcz_rpc::client";

/// Default execution budget for one invocation.
pub const DEFAULT_CALL_BUDGET: Duration = Duration::from_secs(120);

/// Methods whose arguments carry secrets and are never logged.
const SENSITIVE_METHODS: &[&str] = &[
    "dumpprivkey",
    "encryptwallet",
    "importprivkey",
    "signmessage",
    "walletpassphrase",
    "walletpassphrasechange",
    "z_exportkey",
    "z_importkey",
    "z_importviewingkey",
];

/// Client for the daemon's command-line RPC tool.
#[derive(Debug)]
pub struct RpcClient<R> {
    runner: R,
    client: String,
    style: ArgumentStyle,
    budget: Duration,
    late_loading: LateLoadingPolicy,
    retry_delay: Duration,
    lock: Mutex<()>,
}

impl<R: CommandRunner> RpcClient<R> {
    /// Creates a client that runs `client` through `runner`.
    #[must_use]
    pub fn new(runner: R, client: impl Into<String>) -> Self {
        Self {
            runner,
            client: client.into(),
            style: ArgumentStyle::native(),
            budget: DEFAULT_CALL_BUDGET,
            late_loading: LateLoadingPolicy::default(),
            retry_delay: Duration::from_millis(1200),
            lock: Mutex::new(()),
        }
    }

    /// Overrides how positional arguments are rendered.
    #[must_use]
    pub const fn with_argument_style(mut self, style: ArgumentStyle) -> Self {
        self.style = style;
        self
    }

    /// Overrides the default execution budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Sets how "still loading" responses are treated after startup, and the
    /// delay between re-issued calls.
    #[must_use]
    pub const fn with_late_loading(mut self, policy: LateLoadingPolicy, delay: Duration) -> Self {
        self.late_loading = policy;
        self.retry_delay = delay;
        self
    }

    /// Underlying runner.
    #[must_use]
    pub const fn runner(&self) -> &R {
        &self.runner
    }

    /// Path of the client executable.
    #[must_use]
    pub fn client_path(&self) -> &str {
        &self.client
    }

    /// Runs the client once and returns its raw output.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Runner`] if the client cannot be run or overruns
    /// its budget.
    pub fn call_raw(&self, call: &RpcCall) -> Result<String, RpcError> {
        let argv = call.argv(&self.client, self.style);
        let budget = call.budget_override().unwrap_or(self.budget);
        log_call(call);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let output = self.runner.execute(&argv, budget)?;
        debug!(
            target: RPC_TARGET,
            method = call.method(),
            exit_code = ?output.exit_code,
            response_bytes = output.text.len(),
            "client returned"
        );
        Ok(output.text)
    }

    /// Runs the client once and classifies its output.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Runner`] if the client cannot be run. Daemon-side
    /// failures are reported through the returned [`RpcOutcome`].
    pub fn call(&self, call: &RpcCall) -> Result<RpcOutcome, RpcError> {
        let raw = self.call_raw(call)?;
        Ok(classify(&raw))
    }

    /// Runs the call, applying the late-loading policy, and returns the raw
    /// text together with its classification.
    fn call_settled(&self, call: &RpcCall) -> Result<(String, RpcOutcome), RpcError> {
        let retries = self.late_loading.retry_budget();
        let mut attempt = 0;
        loop {
            let raw = self.call_raw(call)?;
            let outcome = classify(&raw);
            let RpcOutcome::StructuredError { message, .. } = &outcome else {
                return Ok((raw, outcome));
            };
            if !outcome.is_loading() {
                return Ok((raw, outcome));
            }
            if attempt >= retries {
                warn!(
                    target: RPC_TARGET,
                    method = call.method(),
                    attempts = attempt + 1,
                    "daemon still loading"
                );
                return Err(RpcError::DaemonLoading {
                    message: message.clone(),
                });
            }
            attempt += 1;
            debug!(
                target: RPC_TARGET,
                method = call.method(),
                attempt,
                "daemon loading, re-issuing call"
            );
            thread::sleep(self.retry_delay);
        }
    }

    /// Runs the call and returns the decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns the [`RpcError`] matching a non-value outcome.
    pub fn call_value(&self, call: &RpcCall) -> Result<Value, RpcError> {
        let (_, outcome) = self.call_settled(call)?;
        outcome.into_value()
    }

    /// Runs the call and requires a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedShape`] for any other JSON shape.
    pub fn call_expecting_object(&self, call: &RpcCall) -> Result<Map<String, Value>, RpcError> {
        match self.call_value(call)? {
            Value::Object(map) => Ok(map),
            other => Err(shape_error(call, JsonShape::Object, &other)),
        }
    }

    /// Runs the call and requires a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedShape`] for any other JSON shape.
    pub fn call_expecting_array(&self, call: &RpcCall) -> Result<Vec<Value>, RpcError> {
        match self.call_value(call)? {
            Value::Array(items) => Ok(items),
            other => Err(shape_error(call, JsonShape::Array, &other)),
        }
    }

    /// Runs the call and returns its result as a single string.
    ///
    /// Methods such as `getnewaddress` print bare text rather than JSON. A
    /// decoded JSON string yields its content, other scalars and undecodable
    /// text yield the trimmed raw output.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedShape`] for objects and arrays and the
    /// matching error for daemon failures.
    pub fn call_expecting_single_string(&self, call: &RpcCall) -> Result<String, RpcError> {
        let (raw, outcome) = self.call_settled(call)?;
        match outcome {
            RpcOutcome::Decoded(Value::String(text)) => Ok(text),
            RpcOutcome::Decoded(value @ (Value::Object(_) | Value::Array(_))) => {
                Err(shape_error(call, JsonShape::String, &value))
            }
            RpcOutcome::Decoded(_) => Ok(raw.trim().to_owned()),
            RpcOutcome::ParseFailure { raw, diagnostic } if raw.to_ascii_lowercase().starts_with("error") => {
                Err(RpcError::Parse { raw, diagnostic })
            }
            RpcOutcome::ParseFailure { raw, .. } => Ok(raw),
            other => other.into_value().map(|_| String::new()),
        }
    }

    /// Runs a call whose success prints nothing.
    ///
    /// # Errors
    ///
    /// Returns the matching error for daemon failures and
    /// [`RpcError::UnexpectedResponse`] for any other output.
    pub fn call_expecting_empty(&self, call: &RpcCall) -> Result<(), RpcError> {
        let (raw, outcome) = self.call_settled(call)?;
        if raw.trim().is_empty() {
            return Ok(());
        }
        match outcome {
            RpcOutcome::Decoded(_) => Err(RpcError::unexpected(call.method(), raw)),
            other => other.into_value().map(drop),
        }
    }
}

fn shape_error(call: &RpcCall, expected: JsonShape, actual: &Value) -> RpcError {
    RpcError::UnexpectedShape {
        method: call.method().to_owned(),
        expected,
        actual: JsonShape::of(actual),
    }
}

fn log_call(call: &RpcCall) {
    if SENSITIVE_METHODS.contains(&call.method()) {
        debug!(
            target: RPC_TARGET,
            method = call.method(),
            flags = ?call.global_flags(),
            args = "<redacted>",
            "invoking client"
        );
    } else {
        debug!(
            target: RPC_TARGET,
            method = call.method(),
            flags = ?call.global_flags(),
            args = ?call.arguments(),
            "invoking client"
        );
    }
}

//! Domain errors raised while invoking the command-line client.
//!
//! All errors use `thiserror`-derived enums with structured context so callers
//! can inspect the failure programmatically. I/O and JSON errors are wrapped in
//! `Arc` to keep the enums cheap to clone and small on the stack.

use std::sync::Arc;

use thiserror::Error;

use crate::classify::JsonShape;

/// Errors raised by a [`CommandRunner`](crate::process::CommandRunner).
#[derive(Debug, Clone, Error)]
pub enum RunnerError {
    /// The argument vector was empty.
    #[error("cannot run an empty command")]
    EmptyCommand,

    /// The executable could not be found or launched.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The child did not finish within its execution budget and was killed.
    #[error("'{program}' did not finish within {budget_ms} ms")]
    Timeout {
        /// Program that overran its budget.
        program: String,
        /// Budget that was exhausted.
        budget_ms: u64,
    },

    /// Waiting on or signalling a child process failed.
    #[error("I/O error while supervising '{program}': {source}")]
    Io {
        /// Program being supervised.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl RunnerError {
    /// Returns true for the "cannot launch subprocess" category.
    #[must_use]
    pub const fn is_spawn(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::EmptyCommand)
    }
}

/// Errors surfaced by the RPC client and the typed wallet operations.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The client process could not be run.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The daemon is not reachable at all.
    #[error("cannot reach the daemon: {raw}")]
    Connection {
        /// Text reported by the client.
        raw: String,
    },

    /// The daemon answered with a well-formed RPC error.
    #[error("daemon returned error {code}: {message}")]
    Structured {
        /// Numeric RPC error code.
        code: i64,
        /// Daemon-supplied message.
        message: String,
    },

    /// The daemon reported it is still loading after startup completed.
    #[error("daemon is still loading: {message}")]
    DaemonLoading {
        /// Progress message reported by the daemon.
        message: String,
    },

    /// The response matched none of the recognised conventions.
    #[error("unparseable response from client: {diagnostic}")]
    Parse {
        /// Raw response text.
        raw: String,
        /// Parser diagnostic.
        diagnostic: String,
    },

    /// The response was JSON of the wrong shape for the call.
    #[error("'{method}' returned {actual} where {expected} was expected")]
    UnexpectedShape {
        /// Method that was invoked.
        method: String,
        /// Shape the caller required.
        expected: JsonShape,
        /// Shape actually returned.
        actual: JsonShape,
    },

    /// The response was well-formed but not what the method should return.
    #[error("unexpected response to '{method}': {raw}")]
    UnexpectedResponse {
        /// Method that was invoked.
        method: String,
        /// Raw response text.
        raw: String,
    },

    /// A JSON response could not be mapped onto the expected record type.
    #[error("failed to decode '{method}' response: {source}")]
    Decode {
        /// Method that was invoked.
        method: String,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A monetary amount changed while being formatted for submission.
    #[error("amount {requested} was not preserved in send request {fragment}")]
    AmountFormatting {
        /// Amount the caller asked to send.
        requested: String,
        /// Constructed request fragment.
        fragment: String,
    },

    /// A monetary amount was not a non-negative decimal number.
    #[error("invalid amount '{amount}'")]
    InvalidAmount {
        /// Offending input.
        amount: String,
    },

    /// A private key did not match any importable format.
    #[error("invalid private key: {reason}")]
    InvalidPrivateKey {
        /// Why the key was rejected.
        reason: String,
    },
}

impl RpcError {
    /// Returns true when the failure means the daemon could not be contacted.
    #[must_use]
    pub const fn is_communication_failure(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Runner(_) | Self::DaemonLoading { .. }
        )
    }

    pub(crate) fn decode(method: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            method: method.to_owned(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn unexpected(method: &str, raw: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            method: method.to_owned(),
            raw: raw.into(),
        }
    }
}

#[cfg(test)]
mod tests;

//! Classification of raw client output.
//!
//! The command-line client reports results and failures through several
//! textual conventions. [`classify`] turns one response into an
//! [`RpcOutcome`], checking the conventions in a fixed order:
//!
//! 1. `error: couldn't connect to server` means the daemon is unreachable.
//! 2. `error: ` followed by JSON is decoded; a `{code, message}` object becomes
//!    a structured error.
//! 3. `error code: <n>` followed by an `error message:` section is a
//!    structured error in the client's multi-line form.
//! 4. Anything else is parsed as a JSON value.
//!
//! Prefix matching ignores ASCII case and leading or trailing whitespace.

use std::fmt;

use serde_json::Value;

use crate::error::RpcError;

/// RPC error code the daemon uses while it is still loading.
pub const LOADING_ERROR_CODE: i64 = -28;

const CONNECTION_PREFIX: &str = "error: couldn't connect to server";
const ERROR_PREFIX: &str = "error: ";
const ERROR_CODE_PREFIX: &str = "error code:";
const MESSAGE_MARKER: &str = "message:";

/// Classified result of one client invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcOutcome {
    /// The response decoded as a JSON value.
    Decoded(Value),
    /// The daemon returned an RPC error.
    StructuredError {
        /// Numeric RPC error code.
        code: i64,
        /// Daemon-supplied message.
        message: String,
    },
    /// The daemon could not be reached.
    ConnectionFailure {
        /// Text reported by the client.
        raw: String,
    },
    /// The response matched no convention.
    ParseFailure {
        /// Text reported by the client.
        raw: String,
        /// Parser diagnostic.
        diagnostic: String,
    },
}

impl RpcOutcome {
    /// Returns true for the daemon's "still loading" error.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::StructuredError {
                code: LOADING_ERROR_CODE,
                ..
            }
        )
    }

    /// Returns true when the daemon could not be reached.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. })
    }

    /// Shape of a decoded value, if any.
    #[must_use]
    pub fn shape(&self) -> Option<JsonShape> {
        match self {
            Self::Decoded(value) => Some(JsonShape::of(value)),
            _ => None,
        }
    }

    /// Converts the outcome into the decoded value or the matching error.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Structured`], [`RpcError::Connection`] or
    /// [`RpcError::Parse`] for the corresponding non-value outcomes.
    pub fn into_value(self) -> Result<Value, RpcError> {
        match self {
            Self::Decoded(value) => Ok(value),
            Self::StructuredError { code, message } => Err(RpcError::Structured { code, message }),
            Self::ConnectionFailure { raw } => Err(RpcError::Connection { raw }),
            Self::ParseFailure { raw, diagnostic } => Err(RpcError::Parse { raw, diagnostic }),
        }
    }
}

/// Top-level kind of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// `null`
    Null,
    /// `true` or `false`
    Bool,
    /// Any number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// An object.
    Object,
}

impl JsonShape {
    /// Shape of `value`.
    #[must_use]
    pub const fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "null",
            Self::Bool => "boolean",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// Classifies one raw client response.
#[must_use]
pub fn classify(raw: &str) -> RpcOutcome {
    let text = raw.trim();

    if starts_with_ignore_case(text, CONNECTION_PREFIX) {
        return RpcOutcome::ConnectionFailure {
            raw: text.to_owned(),
        };
    }

    if starts_with_ignore_case(text, ERROR_PREFIX) {
        let body = text.get(ERROR_PREFIX.len()..).unwrap_or_default();
        return match serde_json::from_str::<Value>(body) {
            Ok(value) => structured_from_value(value),
            Err(err) => RpcOutcome::ParseFailure {
                raw: text.to_owned(),
                diagnostic: err.to_string(),
            },
        };
    }

    if starts_with_ignore_case(text, ERROR_CODE_PREFIX) {
        let body = text.get(ERROR_CODE_PREFIX.len()..).unwrap_or_default();
        return parse_error_code(text, body);
    }

    if text.is_empty() {
        return RpcOutcome::Decoded(Value::Null);
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => RpcOutcome::Decoded(value),
        Err(err) => RpcOutcome::ParseFailure {
            raw: text.to_owned(),
            diagnostic: err.to_string(),
        },
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn structured_from_value(value: Value) -> RpcOutcome {
    let code = value.get("code").and_then(Value::as_i64);
    let message = value.get("message").and_then(Value::as_str);
    match (code, message) {
        (Some(code), Some(message)) => RpcOutcome::StructuredError {
            code,
            message: message.to_owned(),
        },
        _ => RpcOutcome::Decoded(value),
    }
}

fn parse_error_code(text: &str, body: &str) -> RpcOutcome {
    let body = body.trim_start();
    let digits_end = body
        .char_indices()
        .find(|&(index, ch)| !(ch.is_ascii_digit() || (index == 0 && matches!(ch, '-' | '+'))))
        .map_or(body.len(), |(index, _)| index);
    let (digits, rest) = body.split_at(digits_end);

    let Ok(code) = digits.parse::<i64>() else {
        return RpcOutcome::ParseFailure {
            raw: text.to_owned(),
            diagnostic: format!("missing numeric error code in '{text}'"),
        };
    };

    // ASCII lowering keeps byte offsets aligned with `rest`.
    let lowered = rest.to_ascii_lowercase();
    let message = lowered
        .find(MESSAGE_MARKER)
        .and_then(|index| rest.get(index + MESSAGE_MARKER.len()..))
        .unwrap_or(rest);

    RpcOutcome::StructuredError {
        code,
        message: clean_message(message),
    }
}

fn clean_message(message: &str) -> String {
    let joined = message
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let unquoted = joined
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(&joined);
    unquoted.replace("\\\"", "\"")
}

//! Building client command lines.
//!
//! An [`RpcCall`] names a method, its positional arguments and any global
//! client flags. [`RpcCall::argv`] renders it into the argument vector handed
//! to the [`CommandRunner`](crate::CommandRunner), quoting for raw Windows
//! command lines where the launcher needs it.

use std::time::Duration;

/// Global client flag bounding the client's own wait for the daemon.
const CLIENT_TIMEOUT_FLAG: &str = "-rpcclienttimeout";

/// How arguments are rendered before they reach the process launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentStyle {
    /// Arguments are passed exactly as supplied.
    Verbatim,
    /// Arguments are quoted for a launcher that builds a raw Windows command
    /// line.
    WindowsQuoted,
}

impl ArgumentStyle {
    /// Style matching [`SystemRunner`](crate::SystemRunner) on this platform.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(windows) {
            Self::WindowsQuoted
        } else {
            Self::Verbatim
        }
    }

    /// Renders one argument in this style.
    #[must_use]
    pub fn render(self, arg: &str) -> String {
        match self {
            Self::Verbatim => arg.to_owned(),
            Self::WindowsQuoted => quote_windows_argument(arg),
        }
    }
}

/// Wraps an argument in double quotes when it is empty or contains
/// whitespace or quotes, escaping embedded quotes with a backslash.
#[must_use]
pub fn quote_windows_argument(arg: &str) -> String {
    let needs_quoting = arg.is_empty() || arg.chars().any(|ch| ch.is_whitespace() || ch == '"');
    if !needs_quoting {
        return arg.to_owned();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for ch in arg.chars() {
        if ch == '"' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// One method invocation of the command-line client.
///
/// # Example
///
/// ```rust,ignore
/// let call = RpcCall::new("z_getbalance").arg("t1abc").arg("0");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcCall {
    method: String,
    args: Vec<String>,
    global_flags: Vec<String>,
    budget: Option<Duration>,
}

impl RpcCall {
    /// Creates a call with no arguments.
    #[must_use]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Vec::new(),
            global_flags: Vec::new(),
            budget: None,
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several positional arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds a flag placed before the method name, such as `-testnet`.
    #[must_use]
    pub fn global_flag(mut self, flag: impl Into<String>) -> Self {
        self.global_flags.push(flag.into());
        self
    }

    /// Sets the client's own RPC timeout in milliseconds.
    #[must_use]
    pub fn client_timeout_ms(self, millis: u64) -> Self {
        self.global_flag(format!("{CLIENT_TIMEOUT_FLAG}={millis}"))
    }

    /// Overrides the execution budget for this call.
    #[must_use]
    pub const fn budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Method name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Positional arguments.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Flags placed before the method name.
    #[must_use]
    pub fn global_flags(&self) -> &[String] {
        &self.global_flags
    }

    /// Per-call budget override, if any.
    #[must_use]
    pub const fn budget_override(&self) -> Option<Duration> {
        self.budget
    }

    /// Builds `[client, global flags…, method, args…]`.
    #[must_use]
    pub fn argv(&self, client: &str, style: ArgumentStyle) -> Vec<String> {
        let mut argv = Vec::with_capacity(2 + self.global_flags.len() + self.args.len());
        argv.push(client.to_owned());
        argv.extend(self.global_flags.iter().cloned());
        argv.push(self.method.clone());
        argv.extend(self.args.iter().map(|arg| style.render(arg)));
        argv
    }
}

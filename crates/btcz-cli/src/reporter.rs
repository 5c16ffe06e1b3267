//! Rate-limited reporting of refresh failures.
//!
//! Background refreshes can fail on every tick while the daemon is busy. The
//! reporter shows at most one background failure per window and counts the
//! ones it held back. Failures of user-initiated actions are always shown.

use std::fmt::Display;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use tracing::warn;

const REPORTER_TARGET: &str = "btcz_cli::reporter";

/// Minimum spacing between two reported background failures.
pub(crate) const BACKGROUND_REPORT_WINDOW: Duration = Duration::from_secs(45);

/// Where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// A periodic refresh nobody explicitly asked for.
    Background,
    /// An action the operator requested.
    UserInitiated,
}

#[derive(Debug)]
pub(crate) struct ErrorReporter {
    window: Duration,
    last_background: Option<Instant>,
    suppressed: u32,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(BACKGROUND_REPORT_WINDOW)
    }
}

impl ErrorReporter {
    pub(crate) const fn new(window: Duration) -> Self {
        Self {
            window,
            last_background: None,
            suppressed: 0,
        }
    }

    /// Decides whether a failure observed at `now` should be shown.
    pub(crate) fn should_report(&mut self, origin: Origin, now: Instant) -> bool {
        if origin == Origin::UserInitiated {
            return true;
        }
        let due = self
            .last_background
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);
        if due {
            self.last_background = Some(now);
        } else {
            self.suppressed += 1;
        }
        due
    }

    /// Writes `error` to `out` unless it is throttled. Returns whether it was
    /// written.
    pub(crate) fn report(
        &mut self,
        origin: Origin,
        error: &dyn Display,
        out: &mut dyn Write,
    ) -> io::Result<bool> {
        if !self.should_report(origin, Instant::now()) {
            warn!(target: REPORTER_TARGET, %error, "background failure throttled");
            return Ok(false);
        }
        let held_back = std::mem::take(&mut self.suppressed);
        if held_back > 0 {
            writeln!(out, "error: {error} ({held_back} similar failures suppressed)")?;
        } else {
            writeln!(out, "error: {error}")?;
        }
        Ok(true)
    }
}

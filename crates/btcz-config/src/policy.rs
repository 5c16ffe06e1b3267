//! Late-loading policy.
//!
//! Decides what a wallet call does when the daemon reports code -28 after
//! startup polling has already declared it ready.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Treatment of the daemon's "still loading" error (code -28) once startup
/// polling has finished.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LateLoadingPolicy {
    /// Fail the call immediately.
    #[default]
    Fatal,
    /// Re-issue the call after a poll interval, a bounded number of times.
    Retry,
}

impl LateLoadingPolicy {
    /// Number of re-issued calls allowed under [`LateLoadingPolicy::Retry`].
    pub const RETRY_ATTEMPTS: u32 = 10;

    /// Re-issues permitted for a single call.
    #[must_use]
    pub const fn retry_budget(self) -> u32 {
        match self {
            Self::Fatal => 0,
            Self::Retry => Self::RETRY_ATTEMPTS,
        }
    }
}

/// Errors encountered while parsing a [`LateLoadingPolicy`] from text.
pub type LateLoadingPolicyParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn fatal_policy_never_retries() {
        assert_eq!(LateLoadingPolicy::Fatal.retry_budget(), 0);
    }

    #[test]
    fn retry_policy_parses_from_mixed_case() {
        let policy = LateLoadingPolicy::from_str("Retry").expect("parse policy");
        assert_eq!(policy, LateLoadingPolicy::Retry);
        assert_eq!(policy.retry_budget(), LateLoadingPolicy::RETRY_ATTEMPTS);
    }
}

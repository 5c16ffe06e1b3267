//! Configuration loading helpers for the wallet CLI.
//!
//! Leading configuration flags are split off the argument list and handed to
//! `ortho_config`; the remaining tokens form the command.

use std::ffi::{OsStr, OsString};

use btcz_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Kept in sync with the fields of [`btcz_config::Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--install-dir",
    "--data-dir",
    "--export-dir",
    "--daemon-binary",
    "--client-binary",
    "--rpc-timeout-secs",
    "--poll-interval-ms",
    "--late-loading",
    "--log-filter",
    "--log-format",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the program name followed by configuration
    /// flags.
    ///
    /// Configuration flags must appear before the command; flags after it
    /// belong to the command.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Stop;
    }
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the command tokens.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut iter = args.iter();
    let program: Vec<OsString> = iter.next().cloned().into_iter().collect();
    let mut config_arguments = program.clone();
    let mut rest = iter.as_slice();

    while let Some((argument, tail)) = rest.split_first() {
        let FlagAction::Include { needs_value } = classify_flag(argument) else {
            break;
        };
        config_arguments.push(argument.clone());
        rest = tail;
        if needs_value {
            if let Some((value, tail)) = rest.split_first() {
                config_arguments.push(value.clone());
                rest = tail;
            }
        }
    }

    let mut command_arguments = program;
    command_arguments.extend(rest.iter().cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate("--log-filter", FlagAction::Include { needs_value: true })]
    #[case::command("balance", FlagAction::Stop)]
    #[case::unknown("--shielded", FlagAction::Stop)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(classify_flag(OsStr::new(argument)), expected);
    }

    #[test]
    fn leading_config_flags_are_split_from_the_command() {
        let split = split_config_arguments(&os(&[
            "btcz-wallet",
            "--install-dir",
            "/opt/btcz",
            "--log-format=json",
            "new-address",
            "--shielded",
        ]));
        assert_eq!(
            split.config_arguments,
            os(&["btcz-wallet", "--install-dir", "/opt/btcz", "--log-format=json"])
        );
        assert_eq!(
            split.command_arguments,
            os(&["btcz-wallet", "new-address", "--shielded"])
        );
    }

    #[test]
    fn config_flags_after_the_command_stay_with_the_command() {
        let split = split_config_arguments(&os(&["btcz-wallet", "call", "--log-filter", "x"]));
        assert_eq!(split.config_arguments, os(&["btcz-wallet"]));
        assert_eq!(
            split.command_arguments,
            os(&["btcz-wallet", "call", "--log-filter", "x"])
        );
    }

    #[test]
    fn empty_arguments_split_cleanly() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}

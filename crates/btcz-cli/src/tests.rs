//! Runtime tests with a substituted configuration loader.

use std::cell::RefCell;
use std::ffi::OsString;
use std::process::ExitCode;

use btcz_config::Config;
use camino::Utf8PathBuf;
use rstest::rstest;
use tempfile::TempDir;

use crate::commands::Streams;
use crate::config::ConfigLoader;
use crate::{
    AppError, EXIT_INSTALLATION_NOT_FOUND, EXIT_SUCCESS, EXIT_UNEXPECTED, run_with_loader,
};

/// Returns a fixed configuration and records the arguments it was given.
struct StubLoader {
    config: Config,
    seen: RefCell<Vec<OsString>>,
}

impl StubLoader {
    fn new(config: Config) -> Self {
        Self {
            config,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl ConfigLoader for StubLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        self.seen.replace(args.to_vec());
        Ok(self.config.clone())
    }
}

struct Outcome {
    exit: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str], loader: &StubLoader) -> Outcome {
    let args: Vec<OsString> = args.iter().map(OsString::from).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run_with_loader(
        &args,
        &mut Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
        loader,
    );
    Outcome {
        exit,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

/// Configuration pointing at an empty installation directory.
fn empty_installation() -> (TempDir, Config) {
    let dir = TempDir::new().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let config = Config {
        install_dir: Some(path.clone()),
        data_dir: Some(path),
        daemon_binary: String::from("btcz-runtime-test-missing-daemon"),
        client_binary: String::from("btcz-runtime-test-missing-client"),
        ..Config::default()
    };
    (dir, config)
}

#[rstest]
#[case::help("--help")]
#[case::version("--version")]
fn help_and_version_go_to_stdout(#[case] flag: &str) {
    let loader = StubLoader::new(Config::default());

    let outcome = invoke(&["btcz-wallet", flag], &loader);

    assert_eq!(outcome.exit, ExitCode::from(EXIT_SUCCESS));
    assert!(outcome.stdout.contains("btcz-wallet"));
    assert!(outcome.stderr.is_empty());
    assert!(loader.seen.borrow().is_empty());
}

#[test]
fn unknown_command_is_a_usage_error() {
    let loader = StubLoader::new(Config::default());

    let outcome = invoke(&["btcz-wallet", "mine"], &loader);

    assert_eq!(outcome.exit, ExitCode::from(EXIT_UNEXPECTED));
    assert!(outcome.stderr.contains("mine"));
    assert!(outcome.stdout.is_empty());
}

#[test]
fn missing_installation_exits_with_code_one() {
    let (_dir, config) = empty_installation();
    let loader = StubLoader::new(config);

    let outcome = invoke(&["btcz-wallet", "balance"], &loader);

    assert_eq!(outcome.exit, ExitCode::from(EXIT_INSTALLATION_NOT_FOUND));
    assert!(outcome.stderr.starts_with("error: "));
    assert!(outcome.stderr.contains("btcz-runtime-test-missing-daemon"));
}

#[test]
fn leading_configuration_flags_reach_the_loader() {
    let (_dir, config) = empty_installation();
    let loader = StubLoader::new(config);

    let _ = invoke(
        &[
            "btcz-wallet",
            "--late-loading",
            "retry",
            "--log-format=json",
            "send",
            "t1from",
            "t1to",
            "1.0",
        ],
        &loader,
    );

    let seen: Vec<String> = loader
        .seen
        .borrow()
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        seen,
        vec!["btcz-wallet", "--late-loading", "retry", "--log-format=json"]
    );
}

//! Command tests against a scripted client.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use btcz_rpc::testing::ScriptedRunner;
use btcz_rpc::{NetworkMode, RpcClient, RpcError};
use btcz_supervisor::{DaemonSupervisor, Endpoint, SupervisorTimings};
use rstest::{fixture, rstest};

use super::{Streams, execute, watch};
use crate::AppError;
use crate::cli::Command;
use crate::shutdown::ShutdownSignal;

const CLIENT: &str = "/opt/btcz/bitcoinz-cli";
const GETINFO: &str = r#"{"version":2010250,"blocks":1204511,"connections":8}"#;
const CONFIRMED: &str = r#"{"transparent":"1.50","private":"0.25","total":"1.75"}"#;
const UNCONFIRMED: &str = r#"{"transparent":"2.00","private":"0.25","total":"2.25"}"#;

/// Never asks for shutdown.
struct Running;

impl ShutdownSignal for Running {
    fn requested(&self) -> bool {
        false
    }
}

/// Asks for shutdown once the deadline passes.
struct StopAt(Instant);

impl ShutdownSignal for StopAt {
    fn requested(&self) -> bool {
        Instant::now() >= self.0
    }
}

#[derive(Debug)]
struct Ran {
    result: Result<(), AppError>,
    stdout: String,
    stderr: String,
}

#[fixture]
fn runner() -> ScriptedRunner {
    ScriptedRunner::new()
}

fn supervisor(runner: &ScriptedRunner) -> Arc<DaemonSupervisor<ScriptedRunner>> {
    let endpoint = Endpoint::new(
        "/opt/btcz/bitcoinzd",
        CLIENT,
        "/home/operator",
        NetworkMode::Mainnet,
    );
    let client = RpcClient::new(runner.clone(), CLIENT);
    Arc::new(
        DaemonSupervisor::new(endpoint, Arc::new(client))
            .with_timings(SupervisorTimings::immediate()),
    )
}

fn run(command: &Command, runner: &ScriptedRunner) -> Ran {
    run_with(command, &supervisor(runner))
}

fn run_with(command: &Command, supervisor: &Arc<DaemonSupervisor<ScriptedRunner>>) -> Ran {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = execute(
        command,
        supervisor,
        &Running,
        &mut Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
    );
    Ran {
        result,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

fn watch_until(runner: &ScriptedRunner, interval: Duration, run_for: Duration) -> Ran {
    let client = Arc::new(RpcClient::new(runner.clone(), CLIENT));
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let result = watch(
        &client,
        interval,
        &StopAt(Instant::now() + run_for),
        &mut Streams {
            stdout: &mut stdout,
            stderr: &mut stderr,
        },
    );
    Ran {
        result,
        stdout: String::from_utf8(stdout).expect("utf-8 stdout"),
        stderr: String::from_utf8(stderr).expect("utf-8 stderr"),
    }
}

#[rstest]
fn balance_uses_a_running_daemon_without_stopping_it(runner: ScriptedRunner) {
    runner.respond(GETINFO).respond(CONFIRMED).respond(UNCONFIRMED);

    let ran = run(&Command::Balance, &runner);

    ran.result.expect("balance succeeds");
    let lines: Vec<&str> = ran.stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines.first().is_some_and(|line| line.starts_with("transparent")
        && line.ends_with("1.50000000  (unconfirmed 2.00000000)")));
    assert!(lines.get(1).is_some_and(|line| line.starts_with("private")
        && line.ends_with(" 0.25000000")));
    assert!(lines.get(2).is_some_and(|line| line.starts_with("total")
        && line.ends_with("1.75000000  (unconfirmed 2.25000000)")));
    assert_eq!(runner.spawn_count(), 0);
    assert!(!runner.methods().contains(&String::from("stop")));
}

#[rstest]
fn launched_daemon_is_stopped_after_the_command(runner: ScriptedRunner) {
    runner
        .refuse_connections(1)
        .respond(GETINFO)
        .respond("t1VhJrmbsDbXLMXFWkQWB4SQQfRYu6K8xE2\n");

    let ran = run(&Command::NewAddress { shielded: false }, &runner);

    ran.result.expect("new address succeeds");
    assert_eq!(ran.stdout, "t1VhJrmbsDbXLMXFWkQWB4SQQfRYu6K8xE2\n");
    assert_eq!(runner.spawn_count(), 1);
    assert_eq!(
        runner.methods(),
        vec!["getinfo", "getinfo", "getnewaddress", "stop"]
    );
    assert!(!runner.process().alive());
}

#[rstest]
fn failed_startup_stops_the_launched_daemon(runner: ScriptedRunner) {
    runner.refuse_connections(6);

    let ran = run(&Command::Balance, &runner);

    assert!(matches!(ran.result, Err(AppError::Supervisor(_))));
    assert_eq!(runner.spawn_count(), 1);
    assert_eq!(runner.methods().last().map(String::as_str), Some("stop"));
}

#[rstest]
fn interrupt_while_loading_stops_the_launched_daemon(runner: ScriptedRunner) {
    runner
        .refuse_connections(1)
        .fallback("error code: -28\nerror message:\nRescanning...");
    let interrupted = Arc::new(AtomicBool::new(true));
    let supervisor = Arc::new(
        DaemonSupervisor::new(
            Endpoint::new("/opt/btcz/bitcoinzd", CLIENT, "/home/operator", NetworkMode::Mainnet),
            Arc::new(RpcClient::new(runner.clone(), CLIENT)),
        )
        .with_timings(SupervisorTimings::immediate())
        .with_cancellation(interrupted),
    );

    let ran = run_with(&Command::Watch { interval_secs: 5 }, &supervisor);

    ran.result.expect("interrupted watch ends cleanly");
    assert!(ran.stdout.is_empty());
    assert_eq!(runner.spawn_count(), 1);
    assert_eq!(runner.methods(), vec!["getinfo", "stop"]);
    assert!(!runner.process().alive());
}

#[rstest]
fn send_prints_the_operation_id(runner: ScriptedRunner) {
    runner
        .respond(GETINFO)
        .respond("opid-1f2e3d4c-aaaa-bbbb-cccc-0123456789ab");
    let command = Command::Send {
        from: String::from("t1Sender"),
        to: String::from("zs1recipient"),
        amount: String::from("0.5"),
        memo: Some(String::from("thanks")),
        fee: None,
    };

    let ran = run(&command, &runner);

    ran.result.expect("send succeeds");
    assert_eq!(ran.stdout, "opid-1f2e3d4c-aaaa-bbbb-cccc-0123456789ab\n");
    let calls = runner.calls();
    let submitted = calls.last().expect("z_sendmany call");
    assert!(submitted.iter().any(|arg| arg == "z_sendmany"));
    assert!(submitted.iter().any(|arg| arg == "t1Sender"));
}

#[rstest]
#[case::queued(r#"[{"id":"opid-1","status":"queued"}]"#, "queued\n")]
#[case::succeeded(
    r#"[{"id":"opid-1","status":"success","result":{"txid":"ab12"}}]"#,
    "succeeded: ab12\n"
)]
#[case::failed(
    r#"[{"id":"opid-1","status":"failed","error":{"code":-6,"message":"Insufficient funds"}}]"#,
    "failed: Insufficient funds\n"
)]
fn operation_status_is_rendered(
    runner: ScriptedRunner,
    #[case] response: &str,
    #[case] expected: &str,
) {
    runner.respond(GETINFO).respond(response);

    let ran = run(
        &Command::Operation {
            opid: String::from("opid-1"),
        },
        &runner,
    );

    ran.result.expect("operation status succeeds");
    assert_eq!(ran.stdout, expected);
}

#[rstest]
fn stop_without_a_daemon_says_so(runner: ScriptedRunner) {
    let ran = run(&Command::Stop, &runner);

    ran.result.expect("stop succeeds");
    assert_eq!(ran.stdout, "daemon is not running\n");
    assert_eq!(runner.spawn_count(), 0);
}

#[rstest]
fn stop_prints_the_acknowledgement(runner: ScriptedRunner) {
    runner.respond("BitcoinZ server stopping\n");

    let ran = run(&Command::Stop, &runner);

    ran.result.expect("stop succeeds");
    assert_eq!(ran.stdout, "BitcoinZ server stopping\n");
}

#[rstest]
fn call_pretty_prints_json(runner: ScriptedRunner) {
    runner.respond(GETINFO);

    let ran = run(
        &Command::Call {
            method: String::from("getinfo"),
            args: Vec::new(),
        },
        &runner,
    );

    ran.result.expect("call succeeds");
    assert!(ran.stdout.contains("\"blocks\": 1204511"));
    assert_eq!(runner.spawn_count(), 0);
}

#[rstest]
fn call_surfaces_daemon_errors(runner: ScriptedRunner) {
    runner.respond("error code: -8\nerror message:\nBlock height out of range");

    let ran = run(
        &Command::Call {
            method: String::from("getblockhash"),
            args: vec![String::from("99999999")],
        },
        &runner,
    );

    assert!(matches!(
        ran.result,
        Err(AppError::Rpc(RpcError::Structured { code: -8, .. }))
    ));
    assert_eq!(
        runner.calls().last().and_then(|argv| argv.last()).map(String::as_str),
        Some("99999999")
    );
}

#[rstest]
fn status_never_launches_the_daemon(runner: ScriptedRunner) {
    let ran = run(&Command::Status, &runner);

    ran.result.expect("status succeeds");
    assert!(ran.stdout.starts_with("supervisor: idle\n"));
    assert!(ran.stdout.ends_with("daemon: not reachable\n"));
    assert_eq!(runner.spawn_count(), 0);
}

#[rstest]
fn watch_throttles_repeated_failures(runner: ScriptedRunner) {
    let ran = watch_until(&runner, Duration::from_millis(10), Duration::from_millis(300));

    ran.result.expect("watch ends cleanly");
    assert!(ran.stdout.is_empty());
    assert_eq!(ran.stderr.lines().count(), 1, "stderr: {}", ran.stderr);
    assert!(ran.stderr.contains("refresh failed"));
    assert!(runner.methods().len() > 2);
}

#[rstest]
fn watch_prints_refreshed_balances(runner: ScriptedRunner) {
    runner.fallback(CONFIRMED);

    let ran = watch_until(&runner, Duration::from_secs(3600), Duration::from_millis(300));

    ran.result.expect("watch ends cleanly");
    assert!(ran.stdout.lines().any(|line| line.starts_with("total") && line.ends_with(" 1.75000000")));
}

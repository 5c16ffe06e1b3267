//! Tests for daemon shutdown.

use std::sync::Arc;

use btcz_rpc::testing::ScriptedRunner;
use rstest::rstest;

use super::{NoopObserver, StopOutcome, SupervisorState};
use crate::tests::{GETINFO, scripted_supervisor};

fn started(runner: &ScriptedRunner) -> Arc<super::DaemonSupervisor<ScriptedRunner>> {
    runner.refuse_connections(1).fallback(GETINFO);
    let supervisor = scripted_supervisor(runner, Arc::new(NoopObserver));
    supervisor.ensure_running().expect("daemon ready");
    Arc::new(supervisor)
}

fn stop_calls(runner: &ScriptedRunner) -> usize {
    runner
        .methods()
        .iter()
        .filter(|method| *method == "stop")
        .count()
}

#[test]
fn adopted_daemon_is_left_running() {
    let runner = ScriptedRunner::new();
    runner.fallback(GETINFO);
    let supervisor = scripted_supervisor(&runner, Arc::new(NoopObserver));
    supervisor.ensure_running().expect("daemon ready");

    assert_eq!(supervisor.stop(), StopOutcome::NotOwned);
    assert_eq!(stop_calls(&runner), 0);
    assert_eq!(runner.process().terminations(), 0);
}

#[test]
fn idle_supervisor_does_not_stop_anything() {
    let runner = ScriptedRunner::new();
    let supervisor = scripted_supervisor(&runner, Arc::new(NoopObserver));

    assert_eq!(supervisor.stop(), StopOutcome::NotOwned);
    assert!(runner.calls().is_empty());
}

#[test]
fn cooperative_daemon_stops_on_request() {
    let runner = ScriptedRunner::new();
    let supervisor = started(&runner);

    assert_eq!(supervisor.stop(), StopOutcome::Stopped);
    assert_eq!(stop_calls(&runner), 1);
    assert_eq!(runner.process().terminations(), 0);
    assert!(!runner.process().alive());
    assert_eq!(supervisor.state(), SupervisorState::Idle);
}

#[test]
fn unresponsive_daemon_is_terminated() {
    let runner = ScriptedRunner::new();
    let supervisor = started(&runner);
    runner.process().ignore_stop();

    assert_eq!(supervisor.stop(), StopOutcome::Terminated);
    assert_eq!(stop_calls(&runner), 2);
    assert_eq!(runner.process().terminations(), 1);
}

#[test]
fn shutdown_gives_up_on_a_stubborn_daemon() {
    let runner = ScriptedRunner::new();
    let supervisor = started(&runner);
    runner.process().ignore_stop();
    runner.process().survive_terminate();

    assert_eq!(supervisor.stop(), StopOutcome::StillAlive);
    assert!(runner.process().alive());
    assert_eq!(runner.process().terminations(), 1);
}

#[rstest]
#[case::cooperative(false)]
#[case::unresponsive(true)]
fn second_stop_is_a_no_op(#[case] ignore_stop: bool) {
    let runner = ScriptedRunner::new();
    let supervisor = started(&runner);
    if ignore_stop {
        runner.process().ignore_stop();
    }
    supervisor.stop();
    let calls = runner.calls().len();

    assert_eq!(supervisor.stop(), StopOutcome::NotOwned);
    assert_eq!(runner.calls().len(), calls);
    assert!(!supervisor.is_self_started());
}

#[test]
fn guard_stops_the_daemon_when_dropped() {
    let runner = ScriptedRunner::new();
    let supervisor = started(&runner);

    let guard = supervisor.shutdown_guard().expect("self-started daemon");
    assert!(runner.process().alive());
    drop(guard);

    assert!(!runner.process().alive());
    assert_eq!(stop_calls(&runner), 1);
}

#[test]
fn no_guard_for_an_adopted_daemon() {
    let runner = ScriptedRunner::new();
    runner.fallback(GETINFO);
    let supervisor = Arc::new(scripted_supervisor(&runner, Arc::new(NoopObserver)));
    supervisor.ensure_running().expect("daemon ready");

    assert!(supervisor.shutdown_guard().is_none());
}

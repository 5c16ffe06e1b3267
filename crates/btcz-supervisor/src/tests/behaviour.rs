//! Behaviour-driven tests for daemon startup and shutdown.

use std::sync::Arc;

use btcz_rpc::testing::ScriptedRunner;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use crate::{
    DaemonSupervisor, RecordingObserver, StartupReport, StopOutcome, SupervisorError,
};

use super::{GETINFO, loading, scripted_supervisor};

#[derive(Default)]
struct TestWorld {
    runner: ScriptedRunner,
    observer: RecordingObserver,
    supervisor: Option<DaemonSupervisor<ScriptedRunner>>,
    startup: Option<Result<StartupReport, SupervisorError>>,
    stop: Option<StopOutcome>,
}

impl TestWorld {
    fn supervisor(&mut self) -> &DaemonSupervisor<ScriptedRunner> {
        let runner = self.runner.clone();
        let observer = Arc::new(self.observer.clone());
        self.supervisor
            .get_or_insert_with(|| scripted_supervisor(&runner, observer))
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn split_list(text: &str) -> Vec<String> {
    text.trim_matches('"')
        .split(", ")
        .map(str::to_owned)
        .collect()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("no daemon is listening")]
fn given_no_daemon(world: &mut TestWorld) {
    world.runner.refuse_connections(1).fallback(GETINFO);
}

#[given("a daemon is already listening")]
fn given_running_daemon(world: &mut TestWorld) {
    world.runner.fallback(GETINFO);
}

#[given("the daemon answers after {count} refused probes")]
fn given_refused_probes(world: &mut TestWorld, count: usize) {
    world.runner.refuse_connections(count);
}

#[given("the daemon reports loading {message}")]
fn given_loading(world: &mut TestWorld, message: String) {
    world.runner.respond(loading(message.trim_matches('"')));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the supervisor ensures the daemon is running")]
fn when_ensure_running(world: &mut TestWorld) {
    let result = world.supervisor().ensure_running();
    world.startup = Some(result);
}

#[when("the supervisor stops the daemon")]
fn when_stop(world: &mut TestWorld) {
    let outcome = world.supervisor().stop();
    world.stop = Some(outcome);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the daemon is ready")]
fn then_ready(world: &mut TestWorld) {
    match world.startup.as_ref() {
        Some(Ok(_)) => {}
        other => panic!("expected a ready daemon, got {other:?}"),
    }
}

#[then("startup fails as not ready after {iterations} probes")]
fn then_not_ready(world: &mut TestWorld, iterations: u32) {
    match world.startup.as_ref() {
        Some(Err(SupervisorError::NotReady {
            iterations: actual, ..
        })) => assert_eq!(*actual, iterations),
        other => panic!("expected NotReady, got {other:?}"),
    }
}

#[then("the daemon was launched {count} times")]
fn then_launched(world: &mut TestWorld, count: usize) {
    assert_eq!(world.runner.spawn_count(), count);
}

#[then("the supervisor passed through {states}")]
fn then_states(world: &mut TestWorld, states: String) {
    let actual: Vec<String> = world
        .observer
        .states()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(actual, split_list(&states));
}

#[then("the progress messages were {messages}")]
fn then_messages(world: &mut TestWorld, messages: String) {
    assert_eq!(world.observer.messages(), split_list(&messages));
}

#[then("shutdown reports {outcome}")]
fn then_stop_outcome(world: &mut TestWorld, outcome: String) {
    let actual = world.stop.map(|stop| stop.to_string());
    assert_eq!(actual.as_deref(), Some(outcome.trim_matches('"')));
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/daemon_startup.feature")]
fn daemon_startup_behaviour(world: TestWorld) {
    let _ = world;
}

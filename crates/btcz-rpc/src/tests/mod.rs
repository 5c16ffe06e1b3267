//! Crate-level integration and BDD tests.

use crate::testing::ScriptedRunner;
use crate::{ArgumentStyle, RpcCall, RpcClient, RpcOutcome};


fn scripted_client(runner: &ScriptedRunner) -> RpcClient<ScriptedRunner> {
    RpcClient::new(runner.clone(), "bitcoinz-cli").with_argument_style(ArgumentStyle::Verbatim)
}

#[test]
fn readiness_probe_sequence_is_classified_in_order() {
    let runner = ScriptedRunner::new();
    runner
        .refuse_connections(2)
        .respond(r#"error: {"code":-28,"message":"Verifying blocks..."}"#)
        .respond(r#"{"version":2010250,"blocks":100}"#);
    let client = scripted_client(&runner);

    let outcomes: Vec<RpcOutcome> = (0..4)
        .map(|_| client.daemon_info().expect("client runs"))
        .collect();

    assert!(outcomes[0].is_connection_failure());
    assert!(outcomes[1].is_connection_failure());
    assert!(outcomes[2].is_loading());
    assert!(matches!(outcomes[3], RpcOutcome::Decoded(_)));
    assert_eq!(runner.methods(), vec!["getinfo"; 4]);
}

#[test]
fn global_flags_precede_the_method() {
    let runner = ScriptedRunner::new();
    runner.respond("");
    scripted_client(&runner)
        .call(&RpcCall::new("getinfo").global_flag("-testnet"))
        .expect("client runs");
    assert_eq!(runner.calls()[0], vec!["bitcoinz-cli", "-testnet", "getinfo"]);
}

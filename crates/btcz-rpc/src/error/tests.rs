//! Unit tests for error rendering and categorisation.

use std::io;
use std::sync::Arc;

use rstest::rstest;

use super::*;

#[test]
fn spawn_error_names_the_program() {
    let error = RunnerError::Spawn {
        program: String::from("/opt/bitcoinz/bitcoinz-cli"),
        source: Arc::new(io::Error::from(io::ErrorKind::NotFound)),
    };
    assert!(error.is_spawn());
    assert!(error.to_string().contains("/opt/bitcoinz/bitcoinz-cli"));
}

#[test]
fn structured_error_renders_code_and_message() {
    let error = RpcError::Structured {
        code: -8,
        message: String::from("Invalid address"),
    };
    assert_eq!(error.to_string(), "daemon returned error -8: Invalid address");
}

#[test]
fn unexpected_shape_names_both_shapes() {
    let error = RpcError::UnexpectedShape {
        method: String::from("listunspent"),
        expected: JsonShape::Array,
        actual: JsonShape::Object,
    };
    assert_eq!(
        error.to_string(),
        "'listunspent' returned object where array was expected"
    );
}

#[rstest]
#[case::connection(RpcError::Connection { raw: String::from("error: couldn't connect to server") }, true)]
#[case::loading(RpcError::DaemonLoading { message: String::from("Rescanning...") }, true)]
#[case::timeout(RpcError::Runner(RunnerError::Timeout { program: String::from("cli"), budget_ms: 5 }), true)]
#[case::structured(RpcError::Structured { code: -5, message: String::from("bad") }, false)]
#[case::amount(RpcError::InvalidAmount { amount: String::from("x") }, false)]
fn communication_failures_are_categorised(#[case] error: RpcError, #[case] expected: bool) {
    assert_eq!(error.is_communication_failure(), expected);
}

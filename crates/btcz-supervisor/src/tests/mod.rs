//! Shared fixtures and behavioural tests for daemon supervision.

mod behaviour;

use std::sync::Arc;

use btcz_rpc::testing::ScriptedRunner;
use btcz_rpc::{NetworkMode, RpcClient};

use crate::{DaemonSupervisor, Endpoint, StartupObserver, SupervisorTimings};

pub(crate) const DAEMON: &str = "/opt/btcz/bitcoinzd";
pub(crate) const CLIENT: &str = "/opt/btcz/bitcoinz-cli";
pub(crate) const EXPORT_DIR: &str = "/home/operator";

/// Response to `getinfo` from a daemon that has finished loading.
pub(crate) const GETINFO: &str = r#"{"version":2010250,"blocks":1204511,"connections":8}"#;

/// Response to `getinfo` from a daemon that is still loading.
pub(crate) fn loading(message: &str) -> String {
    format!("error code: -28\nerror message:\n{message}")
}

pub(crate) fn endpoint() -> Endpoint {
    Endpoint::new(DAEMON, CLIENT, EXPORT_DIR, NetworkMode::Mainnet)
}

/// Supervisor over `runner` with zero delays.
pub(crate) fn scripted_supervisor(
    runner: &ScriptedRunner,
    observer: Arc<dyn StartupObserver>,
) -> DaemonSupervisor<ScriptedRunner> {
    let client = RpcClient::new(runner.clone(), CLIENT);
    DaemonSupervisor::new(endpoint(), Arc::new(client))
        .with_timings(SupervisorTimings::immediate())
        .with_observer(observer)
}

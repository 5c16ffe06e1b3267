//! Talking to the BitcoinZ daemon through its command-line client.
//!
//! Every daemon method is invoked by running the client executable once and
//! interpreting its textual output:
//!
//! - [`process`] runs external programs behind the [`CommandRunner`] trait.
//! - [`classify`] turns client output into an [`RpcOutcome`].
//! - [`RpcClient`] combines the two, serialises calls and offers
//!   shape-checked entry points.
//! - [`wallet`] layers typed wallet operations on the client.
//! - [`amount`] formats and verifies amounts sent with `z_sendmany`.

pub mod amount;
mod call;
pub mod classify;
mod client;
mod error;
mod network;
pub mod process;
pub mod wallet;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use call::{ArgumentStyle, RpcCall, quote_windows_argument};
pub use classify::{JsonShape, LOADING_ERROR_CODE, RpcOutcome, classify};
pub use client::{DEFAULT_CALL_BUDGET, RpcClient};
pub use error::{RpcError, RunnerError};
pub use network::NetworkMode;
pub use process::{CommandOutput, CommandRunner, ProcessHandle, SystemRunner};
pub use wallet::types::{
    AddressKind, NetworkInfo, OperationStatus, ReceivedNote, SendRequest, ShieldedAddress,
    TransactionRecord, WalletBalance,
};

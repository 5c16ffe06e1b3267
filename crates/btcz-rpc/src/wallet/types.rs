//! Records returned by the typed wallet operations.

use serde::{Deserialize, Serialize};

/// Confirmed and unconfirmed wallet balances, in BTCZ.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WalletBalance {
    /// Confirmed transparent balance.
    pub transparent: f64,
    /// Confirmed shielded balance.
    pub private: f64,
    /// Confirmed total balance.
    pub total: f64,
    /// Transparent balance including unconfirmed outputs.
    pub transparent_unconfirmed: f64,
    /// Shielded balance including unconfirmed notes.
    pub private_unconfirmed: f64,
    /// Total balance including unconfirmed funds.
    pub total_unconfirmed: f64,
}

/// One entry from `listtransactions`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TransactionRecord {
    /// `send`, `receive`, `generate` and so on.
    pub category: String,
    /// Confirmation depth; negative for conflicted transactions.
    pub confirmations: i64,
    /// Signed amount.
    pub amount: f64,
    /// Block or receipt time, seconds since the Unix epoch.
    pub time: i64,
    /// Counterparty address when the wallet knows it.
    #[serde(default)]
    pub address: Option<String>,
    /// Transaction identifier.
    pub txid: String,
}

/// A shielded address held by the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShieldedAddress {
    /// Encoded address.
    pub address: String,
    /// True when only the viewing key is held, so funds cannot be spent.
    pub viewing_key_only: bool,
}

/// A note received by a shielded address.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReceivedNote {
    /// Transaction identifier.
    pub txid: String,
    /// Amount received.
    pub amount: f64,
    /// Hex-encoded memo as reported by the daemon.
    #[serde(default)]
    pub memo: Option<String>,
    /// True for change returned to the wallet.
    #[serde(default)]
    pub change: bool,
}

impl ReceivedNote {
    /// Memo decoded as text, if one was attached.
    #[must_use]
    pub fn memo_text(&self) -> Option<String> {
        self.memo.as_deref().and_then(crate::amount::decode_memo)
    }
}

/// Kind of address to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// A `t…` address.
    Transparent,
    /// A `zs…` address.
    Shielded,
}

/// Parameters for a single-recipient `z_sendmany`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    /// Source address.
    pub from: String,
    /// Destination address.
    pub to: String,
    /// Decimal amount to send.
    pub amount: String,
    /// Optional memo; only meaningful for shielded recipients.
    pub memo: Option<String>,
    /// Optional fee; defaults to [`DEFAULT_FEE`](crate::amount::DEFAULT_FEE).
    pub fee: Option<String>,
}

/// State of an asynchronous wallet operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationStatus {
    /// Waiting to run.
    Queued,
    /// Running.
    Executing,
    /// Finished successfully.
    Succeeded {
        /// Resulting transaction, when the operation produced one.
        txid: Option<String>,
    },
    /// Finished with an error.
    Failed {
        /// Daemon-supplied reason.
        message: String,
    },
}

impl OperationStatus {
    /// Returns true while the operation has not reached a final state.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Queued | Self::Executing)
    }
}

/// Peer and chain-tip summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// Number of connected peers.
    pub connections: u32,
    /// Timestamp of the best block, seconds since the Unix epoch.
    pub last_block_time: i64,
}

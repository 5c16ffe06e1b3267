//! CLI argument definitions for the wallet front-end.

use clap::{Parser, Subcommand};

/// Default interval between background refreshes in `watch`.
pub(crate) const DEFAULT_WATCH_INTERVAL_SECS: u64 = 60;

/// Command-line interface for the BitcoinZ wallet front-end.
#[derive(Parser, Debug)]
#[command(
    name = "btcz-wallet",
    version,
    about = "Operate a BitcoinZ wallet through the daemon's command-line client",
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// The operation to perform.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Wallet and daemon operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Reports the supervisor state and the daemon process listing.
    Status,
    /// Starts the daemon, if needed, and waits until it has loaded.
    Start,
    /// Asks the daemon to stop.
    Stop,
    /// Prints the wallet's transparent, private, and total balances.
    Balance,
    /// Lists the wallet's addresses with their balances.
    Addresses,
    /// Lists recent wallet transactions.
    Transactions,
    /// Creates a new receiving address.
    NewAddress {
        /// Create a shielded address instead of a transparent one.
        #[arg(long)]
        shielded: bool,
    },
    /// Sends funds from one address to another.
    Send {
        /// Source address.
        from: String,
        /// Destination address.
        to: String,
        /// Decimal amount to send.
        amount: String,
        /// Memo attached to a shielded payment.
        #[arg(long)]
        memo: Option<String>,
        /// Transaction fee.
        #[arg(long)]
        fee: Option<String>,
    },
    /// Reports the state of an asynchronous send.
    Operation {
        /// Operation identifier returned by `send`.
        opid: String,
    },
    /// Invokes an arbitrary daemon method and prints its JSON result.
    Call {
        /// Daemon method name.
        method: String,
        /// Positional arguments passed to the method.
        #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Refreshes balances and network status until interrupted.
    Watch {
        /// Seconds between refreshes.
        #[arg(long, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval_secs: u64,
    },
}

//! Typed wallet operations layered on [`RpcClient`].
//!
//! Each operation issues one client call, or a short fixed sequence of calls,
//! and maps the JSON response onto the records in [`types`].

pub mod types;

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::info;

use crate::amount::{format_fee, send_many_fragment};
use crate::call::RpcCall;
use crate::classify::{RpcOutcome, classify};
use crate::client::RpcClient;
use crate::error::RpcError;
use crate::network::NetworkMode;
use crate::process::CommandRunner;

use self::types::{
    AddressKind, NetworkInfo, OperationStatus, ReceivedNote, SendRequest, ShieldedAddress,
    TransactionRecord, WalletBalance,
};

const WALLET_TARGET: &str = "btcz_rpc::wallet";

/// Number of recent transactions requested from `listtransactions`.
pub const TRANSACTION_HISTORY_DEPTH: u32 = 300;

/// Seconds the wallet stays unlocked after `walletpassphrase`.
pub const UNLOCK_SECONDS: u32 = 300;

/// Client-side RPC timeout passed with key imports, in milliseconds.
pub const IMPORT_CLIENT_TIMEOUT_MS: u64 = 5000;

/// Execution budget for key imports, which may trigger a rescan.
pub const IMPORT_BUDGET: Duration = Duration::from_secs(60 * 60);

/// Error code returned by `walletlock` on an unencrypted wallet.
const WRONG_ENCRYPTION_STATE: i64 = -15;

impl<R: CommandRunner> RpcClient<R> {
    /// Probes the daemon with `getinfo`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Runner`] if the client cannot be run.
    pub fn daemon_info(&self) -> Result<RpcOutcome, RpcError> {
        self.call(&RpcCall::new("getinfo"))
    }

    /// Confirmed and unconfirmed wallet balances.
    ///
    /// # Errors
    ///
    /// Propagates client failures and malformed balance fields.
    pub fn total_balance(&self) -> Result<WalletBalance, RpcError> {
        let confirmed = self.call_expecting_object(&RpcCall::new("z_gettotalbalance"))?;
        let unconfirmed =
            self.call_expecting_object(&RpcCall::new("z_gettotalbalance").arg("0"))?;
        Ok(WalletBalance {
            transparent: decimal_field("z_gettotalbalance", &confirmed, "transparent")?,
            private: decimal_field("z_gettotalbalance", &confirmed, "private")?,
            total: decimal_field("z_gettotalbalance", &confirmed, "total")?,
            transparent_unconfirmed: decimal_field("z_gettotalbalance", &unconfirmed, "transparent")?,
            private_unconfirmed: decimal_field("z_gettotalbalance", &unconfirmed, "private")?,
            total_unconfirmed: decimal_field("z_gettotalbalance", &unconfirmed, "total")?,
        })
    }

    /// Recent transparent transactions.
    ///
    /// # Errors
    ///
    /// Propagates client failures and malformed entries.
    pub fn public_transactions(&self) -> Result<Vec<TransactionRecord>, RpcError> {
        let call = RpcCall::new("listtransactions")
            .arg("")
            .arg(TRANSACTION_HISTORY_DEPTH.to_string());
        decode_items(&call, self.call_expecting_array(&call)?)
    }

    /// Shielded addresses, flagging those held only as viewing keys.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn shielded_addresses(&self) -> Result<Vec<ShieldedAddress>, RpcError> {
        let spendable = self.string_items(&RpcCall::new("z_listaddresses"))?;
        let including_watch_only =
            self.string_items(&RpcCall::new("z_listaddresses").arg("true"))?;

        let mut addresses: Vec<ShieldedAddress> = spendable
            .iter()
            .map(|address| ShieldedAddress {
                address: address.clone(),
                viewing_key_only: false,
            })
            .collect();
        for address in including_watch_only {
            if !spendable.contains(&address) {
                addresses.push(ShieldedAddress {
                    address,
                    viewing_key_only: true,
                });
            }
        }
        Ok(addresses)
    }

    /// Notes received by a shielded address, including unconfirmed ones.
    ///
    /// # Errors
    ///
    /// Propagates client failures and malformed entries.
    pub fn received_by_shielded_address(
        &self,
        address: &str,
    ) -> Result<Vec<ReceivedNote>, RpcError> {
        let call = RpcCall::new("z_listreceivedbyaddress").arg(address).arg("0");
        decode_items(&call, self.call_expecting_array(&call)?)
    }

    /// Every transparent address in the wallet, sorted.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn transparent_addresses(&self) -> Result<Vec<String>, RpcError> {
        self.address_field_set(&RpcCall::new("listreceivedbyaddress").args(["0", "true"]))
    }

    /// Transparent addresses holding unspent outputs, sorted.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn addresses_with_unspent_outputs(&self) -> Result<Vec<String>, RpcError> {
        self.address_field_set(&RpcCall::new("listunspent").arg("0"))
    }

    /// Balance of one address; `include_unconfirmed` counts zero-confirmation
    /// funds.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn balance_for_address(
        &self,
        address: &str,
        include_unconfirmed: bool,
    ) -> Result<String, RpcError> {
        let mut call = RpcCall::new("z_getbalance").arg(address);
        if include_unconfirmed {
            call = call.arg("0");
        }
        self.call_expecting_single_string(&call)
    }

    /// Creates a new receiving address.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn new_address(&self, kind: AddressKind) -> Result<String, RpcError> {
        let method = match kind {
            AddressKind::Transparent => "getnewaddress",
            AddressKind::Shielded => "z_getnewaddress",
        };
        self.call_expecting_single_string(&RpcCall::new(method))
    }

    /// Submits a single-recipient `z_sendmany` and returns the operation id.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidAmount`] or [`RpcError::AmountFormatting`]
    /// before anything is sent, and propagates client failures.
    pub fn send_cash(&self, request: &SendRequest) -> Result<String, RpcError> {
        let fragment = send_many_fragment(&request.to, &request.amount, request.memo.as_deref())?;
        let fee = format_fee(request.fee.as_deref())?;
        info!(
            target: WALLET_TARGET,
            from = %request.from,
            to = %request.to,
            amount = %request.amount,
            fee = %fee,
            "submitting z_sendmany"
        );
        let call = RpcCall::new("z_sendmany")
            .arg(request.from.as_str())
            .arg(fragment)
            .arg("1")
            .arg(fee);
        self.call_expecting_single_string(&call)
    }

    /// Status of an asynchronous operation.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedResponse`] for an unknown operation or
    /// status, and propagates client failures.
    pub fn operation_status(&self, operation_id: &str) -> Result<OperationStatus, RpcError> {
        let ids = serde_json::to_string(&[operation_id])
            .map_err(|err| RpcError::decode("z_getoperationstatus", err))?;
        let call = RpcCall::new("z_getoperationstatus").arg(ids);
        let items = self.call_expecting_array(&call)?;
        let entry = items
            .first()
            .ok_or_else(|| RpcError::unexpected(call.method(), "[]"))?;
        parse_operation_status(call.method(), entry)
    }

    /// Peer count and the time of the best block.
    ///
    /// # Errors
    ///
    /// Propagates client failures and non-numeric counts.
    pub fn network_info(&self) -> Result<NetworkInfo, RpcError> {
        let connections = self.call_expecting_single_string(&RpcCall::new("getconnectioncount"))?;
        let connections = connections
            .parse::<u32>()
            .map_err(|_| RpcError::unexpected("getconnectioncount", connections.as_str()))?;

        let height = self.call_expecting_single_string(&RpcCall::new("getblockcount"))?;
        let hash = self.call_expecting_single_string(&RpcCall::new("getblockhash").arg(height))?;
        let block = self.call_expecting_object(&RpcCall::new("getblock").arg(hash))?;
        let last_block_time = block
            .get("time")
            .and_then(Value::as_i64)
            .ok_or_else(|| RpcError::unexpected("getblock", Value::Object(block.clone()).to_string()))?;

        Ok(NetworkInfo {
            connections,
            last_block_time,
        })
    }

    /// Transaction details flattened into dotted and indexed keys.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn transaction_details(&self, txid: &str) -> Result<BTreeMap<String, String>, RpcError> {
        let details = self.call_expecting_object(&RpcCall::new("gettransaction").arg(txid))?;
        let mut flat = BTreeMap::new();
        for (name, value) in &details {
            flatten_into(name, value, &mut flat);
        }
        Ok(flat)
    }

    /// Locks an encrypted wallet.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn lock_wallet(&self) -> Result<(), RpcError> {
        self.call_expecting_empty(&RpcCall::new("walletlock"))
    }

    /// Unlocks an encrypted wallet for [`UNLOCK_SECONDS`].
    ///
    /// # Errors
    ///
    /// Propagates client failures, including a wrong passphrase.
    pub fn unlock_wallet(&self, passphrase: &str) -> Result<(), RpcError> {
        self.call_expecting_empty(
            &RpcCall::new("walletpassphrase")
                .arg(passphrase)
                .arg(UNLOCK_SECONDS.to_string()),
        )
    }

    /// Whether the wallet is encrypted, detected by attempting `walletlock`.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::UnexpectedResponse`] for any other response.
    pub fn is_wallet_encrypted(&self) -> Result<bool, RpcError> {
        let call = RpcCall::new("walletlock");
        let raw = self.call_raw(&call)?;
        if raw.trim().is_empty() {
            return Ok(true);
        }
        match classify(&raw) {
            RpcOutcome::StructuredError { code, message }
                if code == WRONG_ENCRYPTION_STATE
                    && message.to_ascii_lowercase().contains("unencrypted wallet") =>
            {
                Ok(false)
            }
            RpcOutcome::ConnectionFailure { raw } => Err(RpcError::Connection { raw }),
            _ => Err(RpcError::unexpected(call.method(), raw)),
        }
    }

    /// Encrypts the wallet; the daemon shuts down afterwards.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn encrypt_wallet(&self, passphrase: &str) -> Result<String, RpcError> {
        self.call_expecting_single_string(&RpcCall::new("encryptwallet").arg(passphrase))
    }

    /// Copies the wallet file into the export directory.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn backup_wallet(&self, file_name: &str) -> Result<String, RpcError> {
        self.call_expecting_single_string(&RpcCall::new("backupwallet").arg(file_name))
    }

    /// Exports all keys into the export directory.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn export_wallet(&self, file_name: &str) -> Result<String, RpcError> {
        self.call_expecting_single_string(&RpcCall::new("z_exportwallet").arg(file_name))
    }

    /// Imports keys from a file previously written by [`Self::export_wallet`].
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn import_wallet(&self, path: &str) -> Result<String, RpcError> {
        self.call_expecting_single_string(
            &RpcCall::new("z_importwallet")
                .arg(path)
                .budget(IMPORT_BUDGET),
        )
    }

    /// Signs `message` with the key of a transparent address.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn sign_message(&self, address: &str, message: &str) -> Result<String, RpcError> {
        self.call_expecting_single_string(&RpcCall::new("signmessage").args([address, message]))
    }

    /// Verifies a message signature.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn verify_message(
        &self,
        address: &str,
        signature: &str,
        message: &str,
    ) -> Result<bool, RpcError> {
        let response = self.call_expecting_single_string(
            &RpcCall::new("verifymessage").args([address, signature, message]),
        )?;
        Ok(response.trim().eq_ignore_ascii_case("true"))
    }

    /// Private key of an address held by the wallet.
    ///
    /// # Errors
    ///
    /// Propagates client failures.
    pub fn private_key(&self, address: &str) -> Result<String, RpcError> {
        let method = if address.starts_with('z') {
            "z_exportkey"
        } else {
            "dumpprivkey"
        };
        self.call_expecting_single_string(&RpcCall::new(method).arg(address))
    }

    /// Imports a spending key, transparent key or viewing key.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::InvalidPrivateKey`] for a key whose prefix is not
    /// valid on `network`, and propagates client failures.
    pub fn import_private_key(&self, key: &str, network: NetworkMode) -> Result<String, RpcError> {
        let key = key.trim();
        let Some(first) = key.chars().next() else {
            return Err(RpcError::InvalidPrivateKey {
                reason: String::from("key is empty"),
            });
        };
        let method = match first {
            'S' | 's' => "z_importkey",
            'Z' | 'z' => "z_importviewingkey",
            prefix if network.transparent_key_prefixes().contains(&prefix) => "importprivkey",
            prefix => {
                return Err(RpcError::InvalidPrivateKey {
                    reason: format!("unrecognised prefix '{prefix}' for {network}"),
                });
            }
        };
        info!(target: WALLET_TARGET, method, %network, "importing key");
        self.call_expecting_single_string(
            &RpcCall::new(method)
                .client_timeout_ms(IMPORT_CLIENT_TIMEOUT_MS)
                .arg(key)
                .budget(IMPORT_BUDGET),
        )
    }

    /// Asks the daemon to shut down and returns its acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`RpcError::Runner`] if the client cannot be run.
    pub fn stop_daemon(&self) -> Result<String, RpcError> {
        self.call_raw(&RpcCall::new("stop"))
    }

    fn string_items(&self, call: &RpcCall) -> Result<Vec<String>, RpcError> {
        self.call_expecting_array(call)?
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(RpcError::unexpected(call.method(), other.to_string())),
            })
            .collect()
    }

    fn address_field_set(&self, call: &RpcCall) -> Result<Vec<String>, RpcError> {
        let set: BTreeSet<String> = self
            .call_expecting_array(call)?
            .iter()
            .filter_map(|entry| entry.get("address").and_then(Value::as_str))
            .map(str::to_owned)
            .collect();
        Ok(set.into_iter().collect())
    }
}

fn decode_items<T: DeserializeOwned>(call: &RpcCall, items: Vec<Value>) -> Result<Vec<T>, RpcError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|err| RpcError::decode(call.method(), err)))
        .collect()
}

/// Reads a balance field that the daemon may render as a string or number.
fn decimal_field(method: &str, object: &Map<String, Value>, key: &str) -> Result<f64, RpcError> {
    let parsed = match object.get(key) {
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        Some(Value::Number(number)) => number.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| RpcError::unexpected(method, format!("missing or invalid '{key}'")))
}

fn parse_operation_status(method: &str, entry: &Value) -> Result<OperationStatus, RpcError> {
    let status = entry
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::unexpected(method, entry.to_string()))?;
    match status {
        "queued" => Ok(OperationStatus::Queued),
        "executing" => Ok(OperationStatus::Executing),
        "success" => Ok(OperationStatus::Succeeded {
            txid: entry
                .get("result")
                .and_then(|result| result.get("txid"))
                .and_then(Value::as_str)
                .map(str::to_owned),
        }),
        "failed" | "error" => Ok(OperationStatus::Failed {
            message: entry
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("no error message reported")
                .to_owned(),
        }),
        _ => Err(RpcError::unexpected(method, entry.to_string())),
    }
}

/// Flattens nested JSON into `parent.child` and `parent[index]` keys.
/// Strings are stored without quotes, other scalars in JSON notation.
pub fn flatten_into(name: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(members) => {
            for (member, nested) in members {
                flatten_into(&format!("{name}.{member}"), nested, out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(&format!("{name}[{index}]"), nested, out);
            }
        }
        Value::String(text) => {
            out.insert(name.to_owned(), text.clone());
        }
        scalar => {
            out.insert(name.to_owned(), scalar.to_string());
        }
    }
}

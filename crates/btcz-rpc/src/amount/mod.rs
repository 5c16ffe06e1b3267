//! Formatting and verifying amounts submitted to `z_sendmany`.
//!
//! Amounts are rendered in fixed-point notation with between two and eight
//! decimal places. Every constructed request fragment is parsed back and the
//! amount compared with the requested one, so a formatting slip can never
//! send a different sum.

use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;

use crate::error::RpcError;

/// Largest accepted difference between requested and encoded amounts.
pub const AMOUNT_TOLERANCE: f64 = 1.5e-8;

/// Transaction fee used when the caller does not supply one.
pub const DEFAULT_FEE: &str = "0.0001";

const MIN_DECIMALS: usize = 2;
const MAX_DECIMALS: usize = 8;

#[derive(Serialize)]
struct Recipient<'a> {
    address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<&'a str>,
    amount: &'a RawValue,
}

fn parse_amount(amount: &str) -> Result<f64, RpcError> {
    let invalid = || RpcError::InvalidAmount {
        amount: amount.to_owned(),
    };
    let value = amount.trim().parse::<f64>().map_err(|_| invalid())?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(invalid())
    }
}

/// Renders `amount` with two to eight decimal places and no exponent.
///
/// # Errors
///
/// Returns [`RpcError::InvalidAmount`] unless `amount` is a non-negative
/// decimal number.
pub fn format_amount(amount: &str) -> Result<String, RpcError> {
    let value = parse_amount(amount)?;
    let fixed = format!("{:.*}", MAX_DECIMALS, value);
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let significant = fraction.trim_end_matches('0');
    let keep = significant.len().max(MIN_DECIMALS);
    let fraction = fraction.get(..keep).unwrap_or(fraction);
    Ok(format!("{whole}.{fraction}"))
}

/// Formats a fee, substituting [`DEFAULT_FEE`] when it is blank.
///
/// # Errors
///
/// Returns [`RpcError::InvalidAmount`] for a malformed fee.
pub fn format_fee(fee: Option<&str>) -> Result<String, RpcError> {
    match fee.map(str::trim) {
        Some(fee) if !fee.is_empty() => format_amount(fee),
        _ => format_amount(DEFAULT_FEE),
    }
}

/// Hex-encodes the UTF-8 bytes of a memo.
#[must_use]
pub fn encode_memo(memo: &str) -> String {
    memo.bytes().map(|byte| format!("{byte:02x}")).collect()
}

/// Decodes a hex memo as returned by the daemon.
///
/// Returns `None` for the "no memo" marker (`f6…`), malformed hex, or text
/// that is not UTF-8. Trailing zero padding is removed.
#[must_use]
pub fn decode_memo(hex: &str) -> Option<String> {
    if hex.is_empty() || hex.starts_with("f6") || hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = (0..hex.len())
        .step_by(2)
        .map(|index| hex.get(index..index + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect::<Option<Vec<u8>>>()?;
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8(bytes).ok()
}

/// Builds the single-recipient JSON array passed to `z_sendmany`.
///
/// The memo is hex-encoded and omitted when empty. The fragment is verified
/// with [`verify_send_many_fragment`] before it is returned.
///
/// # Errors
///
/// Returns [`RpcError::InvalidAmount`] for a malformed amount and
/// [`RpcError::AmountFormatting`] if the encoded amount differs from the
/// requested one.
pub fn send_many_fragment(
    address: &str,
    amount: &str,
    memo: Option<&str>,
) -> Result<String, RpcError> {
    let formatted = format_amount(amount)?;
    let raw_amount = RawValue::from_string(formatted).map_err(|_| RpcError::InvalidAmount {
        amount: amount.to_owned(),
    })?;
    let memo_hex = memo
        .map(str::trim)
        .filter(|memo| !memo.is_empty())
        .map(encode_memo);
    let recipient = Recipient {
        address,
        memo: memo_hex.as_deref(),
        amount: &raw_amount,
    };
    let fragment = serde_json::to_string(&[recipient])
        .map_err(|err| RpcError::decode("z_sendmany", err))?;
    verify_send_many_fragment(&fragment, amount)?;
    Ok(fragment)
}

/// Checks that the first recipient's amount in `fragment` is a decimal within
/// [`AMOUNT_TOLERANCE`] of `requested`.
///
/// # Errors
///
/// Returns [`RpcError::AmountFormatting`] if the amount is missing, integral,
/// or differs from the request.
pub fn verify_send_many_fragment(fragment: &str, requested: &str) -> Result<(), RpcError> {
    let requested_value = parse_amount(requested)?;
    let mismatch = || RpcError::AmountFormatting {
        requested: requested.to_owned(),
        fragment: fragment.to_owned(),
    };
    let parsed: Value = serde_json::from_str(fragment).map_err(|_| mismatch())?;
    let encoded = parsed
        .get(0)
        .and_then(|recipient| recipient.get("amount"))
        .and_then(|amount| match amount {
            Value::Number(number) if number.is_f64() => number.as_f64(),
            _ => None,
        })
        .ok_or_else(mismatch)?;
    if (requested_value - encoded).abs() < AMOUNT_TOLERANCE {
        Ok(())
    } else {
        Err(mismatch())
    }
}

#[cfg(test)]
mod tests;

//! Plain-text rendering of command results.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use btcz_rpc::{
    NetworkInfo, OperationStatus, ReceivedNote, RpcError, RpcOutcome, TransactionRecord,
    WalletBalance,
};
use btcz_supervisor::{DaemonState, DaemonStatusReport, StartupReport};

pub(super) fn status(
    report: &DaemonStatusReport,
    daemon: &Result<RpcOutcome, RpcError>,
    out: &mut dyn Write,
) -> io::Result<()> {
    writeln!(out, "supervisor: {}", report.state)?;
    match report.process {
        DaemonState::Running(usage) => {
            write!(out, "process: running (pid {}, rss {} KiB", usage.pid, usage.resident_kib)?;
            if let Some(cpu) = usage.cpu_percent {
                write!(out, ", cpu {cpu:.1}%")?;
            }
            writeln!(out, ")")?;
        }
        DaemonState::NotRunning => writeln!(out, "process: not running")?,
        DaemonState::Unknown => writeln!(out, "process: unknown")?,
    }
    let answer = match daemon {
        Ok(outcome) if outcome.is_loading() => match outcome {
            RpcOutcome::StructuredError { message, .. } => format!("loading ({message})"),
            _ => String::from("loading"),
        },
        Ok(RpcOutcome::Decoded(_)) => String::from("answering"),
        Ok(RpcOutcome::ConnectionFailure { .. }) => String::from("not reachable"),
        Ok(RpcOutcome::StructuredError { code, message }) => format!("error {code}: {message}"),
        Ok(RpcOutcome::ParseFailure { .. }) => String::from("unrecognised response"),
        Err(error) => format!("unavailable ({error})"),
    };
    writeln!(out, "daemon: {answer}")
}

pub(super) fn startup(report: &StartupReport, out: &mut dyn Write) -> io::Result<()> {
    let origin = if report.self_started {
        "started"
    } else {
        "already running"
    };
    writeln!(
        out,
        "daemon ready ({origin}, {} probes, {:.1}s)",
        report.iterations,
        report.elapsed.as_secs_f64()
    )
}

pub(super) fn balance(balance: &WalletBalance, out: &mut dyn Write) -> io::Result<()> {
    let rows = [
        ("transparent", balance.transparent, balance.transparent_unconfirmed),
        ("private", balance.private, balance.private_unconfirmed),
        ("total", balance.total, balance.total_unconfirmed),
    ];
    for (label, confirmed, unconfirmed) in rows {
        write!(out, "{label:<12}{confirmed:>18.8}")?;
        if (unconfirmed - confirmed).abs() > f64::EPSILON {
            write!(out, "  (unconfirmed {unconfirmed:.8})")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub(super) fn transaction(record: &TransactionRecord, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "{:<12} {:<8} {:>18.8} {:>6}  {}  {}",
        record.time,
        record.category,
        record.amount,
        record.confirmations,
        record.address.as_deref().unwrap_or("-"),
        record.txid
    )
}

pub(super) fn received_note(
    address: &str,
    note: &ReceivedNote,
    out: &mut dyn Write,
) -> io::Result<()> {
    let kind = if note.change { "change" } else { "receive" };
    write!(out, "{:<12} {kind:<8} {:>18.8} {:>6}  {address}  {}", "-", note.amount, "-", note.txid)?;
    if let Some(memo) = note.memo_text() {
        write!(out, "  memo: {memo}")?;
    }
    writeln!(out)
}

pub(super) fn operation(status: &OperationStatus, out: &mut dyn Write) -> io::Result<()> {
    match status {
        OperationStatus::Queued => writeln!(out, "queued"),
        OperationStatus::Executing => writeln!(out, "executing"),
        OperationStatus::Succeeded { txid: Some(txid) } => writeln!(out, "succeeded: {txid}"),
        OperationStatus::Succeeded { txid: None } => writeln!(out, "succeeded"),
        OperationStatus::Failed { message } => writeln!(out, "failed: {message}"),
    }
}

pub(super) fn network(info: &NetworkInfo, out: &mut dyn Write) -> io::Result<()> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));
    let age = now.saturating_sub(info.last_block_time).max(0);
    writeln!(
        out,
        "network: {} connections, last block {age}s ago",
        info.connections
    )
}

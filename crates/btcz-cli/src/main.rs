//! CLI entrypoint for the BitcoinZ wallet front-end.
//!
//! The binary delegates to [`btcz_cli::run`], which loads configuration,
//! parses the command, supervises the daemon, and renders results.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    // Refresh threads log to stderr, so neither handle is held locked.
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    btcz_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}

//! Termination signal handling for long-running commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tracing::debug;

use crate::AppError;

const SHUTDOWN_TARGET: &str = "btcz_cli::shutdown";

/// Reports whether the operator asked the process to stop.
pub(crate) trait ShutdownSignal: Send + Sync {
    fn requested(&self) -> bool;
}

/// Shutdown flag raised by SIGINT or SIGTERM.
#[derive(Debug, Clone)]
pub(crate) struct SystemShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl SystemShutdownSignal {
    pub(crate) fn install() -> Result<Self, AppError> {
        let flag = Arc::new(AtomicBool::new(false));
        for signal in [SIGINT, SIGTERM] {
            signal_hook::flag::register(signal, Arc::clone(&flag))
                .map_err(AppError::InstallSignals)?;
        }
        debug!(target: SHUTDOWN_TARGET, "signal handlers installed");
        Ok(Self { flag })
    }

    /// Flag shared with the signal handlers.
    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Signal for commands that finish on their own.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct NeverRequested;

impl ShutdownSignal for NeverRequested {
    fn requested(&self) -> bool {
        false
    }
}

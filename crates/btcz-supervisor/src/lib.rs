//! Locating, starting, inspecting, and stopping the BitcoinZ daemon.
//!
//! - [`InstallationLocator`] resolves the daemon and client executables into
//!   an [`Endpoint`] and reads the configured network.
//! - [`DaemonSupervisor`] drives the startup state machine and owns shutdown
//!   of a daemon it launched.
//! - [`ProcessStatusProbe`] inspects the daemon through the process listing.

mod error;
pub mod locator;
pub mod probe;
mod supervisor;

#[cfg(test)]
mod tests;

pub use error::{LocatorError, SupervisorError};
pub use locator::{Endpoint, InstallationLocator, detect_network_mode};
pub use probe::{DaemonState, ListingFormat, ProcessStatusProbe, ResourceUsage};
pub use supervisor::{
    DaemonStatusReport, DaemonSupervisor, NoopObserver, ObservedEvent, RecordingObserver,
    ShutdownGuard, StartupObserver, StartupReport, StopOutcome, SupervisorState,
    SupervisorTimings,
};

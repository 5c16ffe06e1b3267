//! Startup progress reporting.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Supervisor lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Nothing has been attempted yet.
    Idle,
    /// Checking whether a daemon already answers.
    Probing,
    /// A daemon was already listening.
    AlreadyRunning,
    /// Launching a new daemon.
    Starting,
    /// Waiting for the daemon to finish loading.
    Polling,
    /// The daemon answers normally.
    Ready,
    /// Startup failed.
    Failed,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Probing => "probing",
            Self::AlreadyRunning => "already running",
            Self::Starting => "starting",
            Self::Polling => "polling",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives supervisor state transitions and loading progress.
pub trait StartupObserver: Send + Sync {
    /// Called on every state transition.
    fn state_changed(&self, state: SupervisorState);

    /// Called with the daemon's progress message while it is loading.
    fn progress(&self, message: &str);
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StartupObserver for NoopObserver {
    fn state_changed(&self, _state: SupervisorState) {}

    fn progress(&self, _message: &str) {}
}

/// Event captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    /// A state transition.
    State(SupervisorState),
    /// A progress message.
    Progress(String),
}

/// Observer that keeps every event for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    /// Every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// State transitions received so far.
    #[must_use]
    pub fn states(&self) -> Vec<SupervisorState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::State(state) => Some(state),
                ObservedEvent::Progress(_) => None,
            })
            .collect()
    }

    /// Progress messages received so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ObservedEvent::Progress(message) => Some(message),
                ObservedEvent::State(_) => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl StartupObserver for RecordingObserver {
    fn state_changed(&self, state: SupervisorState) {
        self.push(ObservedEvent::State(state));
    }

    fn progress(&self, message: &str) {
        self.push(ObservedEvent::Progress(message.to_owned()));
    }
}

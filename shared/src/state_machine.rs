//! Session State Machine
//!
//! Defines the lifecycle of one logging session and its valid transitions.

/// Lifecycle states of a modem logging session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, modem not yet probed
    Initializing,
    /// Modem answered the probe, waiting for time sync and reporting enable
    AwaitingTimeSync,
    /// `+CIEV` reporting is on and the ingestion loop is running
    EventReportingEnabled,
    /// Shutdown sequence in progress
    Draining,
    /// Reporting disabled and transport released
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Initializing => "initializing",
            SessionState::AwaitingTimeSync => "awaiting time sync",
            SessionState::EventReportingEnabled => "event reporting enabled",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Basic probe answered `OK`
    ModemResponding,
    /// Event reporting enable answered `OK`
    ReportingEnabled,
    /// Operator asked the session to stop
    StopRequested,
    /// A fatal error occurred
    Failed { reason: String },
    /// Reporting disabled and transport closed
    ShutdownComplete,
}

/// Result of a state transition attempt
#[derive(Debug, Clone)]
pub enum TransitionResult {
    /// Transition was valid and state changed
    Success(SessionState),
    /// Transition was invalid from current state
    Invalid { from: SessionState, event: SessionEvent },
    /// A failure moved the session to draining
    Aborted { from: SessionState, reason: String },
}

/// The state machine for one logging session
#[derive(Debug)]
pub struct SessionStateMachine {
    current_state: SessionState,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateMachine {
    /// Create a new state machine in Initializing state
    pub fn new() -> Self {
        Self {
            current_state: SessionState::Initializing,
        }
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.current_state
    }

    /// True while the session still owns a live transport
    pub fn is_active(&self) -> bool {
        !matches!(
            self.current_state,
            SessionState::Draining | SessionState::Closed
        )
    }

    /// True once shutdown has completed
    pub fn is_closed(&self) -> bool {
        self.current_state == SessionState::Closed
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: SessionEvent) -> TransitionResult {
        if let SessionEvent::Failed { reason } = &event {
            if self.is_active() {
                let from = self.current_state;
                self.current_state = SessionState::Draining;
                return TransitionResult::Aborted {
                    from,
                    reason: reason.clone(),
                };
            }
        }

        match self.get_next_state(&event) {
            Some(state) => {
                self.current_state = state;
                TransitionResult::Success(state)
            }
            None => TransitionResult::Invalid {
                from: self.current_state,
                event,
            },
        }
    }

    /// Get the next state for a given event, if the transition is valid
    fn get_next_state(&self, event: &SessionEvent) -> Option<SessionState> {
        use SessionEvent::*;
        use SessionState::*;

        match (self.current_state, event) {
            (Initializing, ModemResponding) => Some(AwaitingTimeSync),
            (AwaitingTimeSync, ReportingEnabled) => Some(EventReportingEnabled),

            // Stop may arrive at any point before draining
            (Initializing | AwaitingTimeSync | EventReportingEnabled, StopRequested) => {
                Some(Draining)
            }
            (Draining, StopRequested) => Some(Draining),

            (Draining, ShutdownComplete) => Some(Closed),

            _ => None,
        }
    }
}

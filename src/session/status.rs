//! Observer-facing status stream

use crate::timesync::TimeSource;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Progress and failure notices emitted by a session
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// `ATE0` did not answer `OK` (tolerated)
    EchoSuppressFailed,
    /// Modem answered the basic probe
    ModemResponding,
    /// Offset refreshed from Iridium time
    TimeSynced { modem_time: DateTime<Utc> },
    /// Iridium time could not be obtained
    TimeSyncUnavailable { source: TimeSource },
    /// `+CIEV` reporting is on
    ReportingEnabled,
    /// An event was written to the log (the exact logged line)
    EventLogged(String),
    /// Loop stopped on request
    Stopped { events: u64 },
    /// A fatal error aborted the session
    Fatal { reason: String },
    /// Reporting disabled and transport released
    ShutdownComplete,
}

/// Sending half of the status stream
pub type StatusSender = mpsc::UnboundedSender<StatusEvent>;

/// Receiving half of the status stream
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Create a status stream
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}

//! Fatal session errors

use std::io;
use thiserror::Error;

/// Conditions that end a session
///
/// Time sync failures and malformed lines are absorbed where they occur and
/// never reach this type.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Serial transport unavailable: {0}")]
    TransportUnavailable(#[from] io::Error),

    #[error("Modem not responding to AT command")]
    ModemUnresponsive,

    #[error("Failed to enable CIER event reporting")]
    ReportingEnableFailed,

    #[error("Could not write to log after {events_logged} events: {source}")]
    SinkWriteFailure {
        events_logged: u64,
        #[source]
        source: io::Error,
    },
}

impl SessionError {
    pub(crate) fn sink(events_logged: u64, source: io::Error) -> Self {
        SessionError::SinkWriteFailure {
            events_logged,
            source,
        }
    }
}

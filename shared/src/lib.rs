//! CIER Logger Shared Protocol Types
//!
//! This crate provides the protocol constants, line codec, Iridium time codec
//! and session state machine used by the logger binary.

pub mod codec;
pub mod state_machine;
pub mod time_codec;

pub use codec::{CodecError, LineDecoder};
pub use state_machine::{SessionEvent, SessionState, SessionStateMachine, TransitionResult};
pub use time_codec::{decode, parse_msstm_line, time_from_response, ModemTimeSample};

/// AT command set spoken to the 9602/9603 modem
pub mod protocol {
    /// Suppress command echo
    pub const CMD_ECHO_OFF: &str = "ATE0";

    /// Basic liveness probe
    pub const CMD_PROBE: &str = "AT";

    /// Query Iridium system time
    pub const CMD_SYSTEM_TIME: &str = "AT-MSSTM";

    /// Enable indicator event reporting (signal, service, antenna, SV/beam)
    pub const CMD_EVENTS_ON: &str = "AT+CIER=1,1,1,1,1";

    /// Disable indicator event reporting
    pub const CMD_EVENTS_OFF: &str = "AT+CIER=0";

    /// Every command is terminated by a single carriage return
    pub const COMMAND_TERMINATOR: u8 = b'\r';

    /// Lines that end a command response
    pub const RESPONSE_TERMINATORS: [&str; 3] = ["OK", "ERROR", "READY"];

    /// Success terminator
    pub const RESPONSE_OK: &str = "OK";

    /// Marker of the system time reply line
    pub const MSSTM_MARKER: &str = "-MSSTM:";

    /// Payload returned by `AT-MSSTM` without network coverage
    pub const NO_NETWORK_SERVICE: &str = "no network service";

    /// Prefix of unsolicited indicator events
    pub const EVENT_PREFIX: &str = "+CIEV:";

    /// Returns true if `line` ends a command response
    pub fn is_terminator(line: &str) -> bool {
        RESPONSE_TERMINATORS.contains(&line)
    }
}

/// Timing parameters for the modem session
pub mod timing {
    /// Delay between writing a command and polling for its reply
    pub const SETTLE_DELAY_MS: u64 = 200;

    /// Timeout for ordinary commands
    pub const COMMAND_TIMEOUT_MS: u64 = 2000;

    /// Timeout for `AT-MSSTM`, network time queries are slower
    pub const TIME_QUERY_TIMEOUT_MS: u64 = 5000;

    /// Seconds between clock resync attempts
    pub const RESYNC_INTERVAL_SECS: u64 = 300;

    /// Sleep when no input is waiting
    pub const IDLE_POLL_MS: u64 = 10;

    /// Serial inter-read timeout
    pub const READ_TIMEOUT_MS: u64 = 1000;

    /// Longest the event loop waits for a partial line to complete
    pub const LINE_WAIT_MS: u64 = 250;

    /// Default RockBLOCK baud rate
    pub const DEFAULT_BAUD_RATE: u32 = 19_200;
}

#[cfg(test)]
mod tests {
    use super::protocol::*;

    #[test]
    fn test_terminators() {
        assert!(is_terminator("OK"));
        assert!(is_terminator("ERROR"));
        assert!(is_terminator("READY"));
        assert!(!is_terminator("OK "));
        assert!(!is_terminator("ok"));
        assert!(!is_terminator("-MSSTM: 0"));
    }
}

//! Session configuration

use cier_shared::timing;
use std::time::Duration;

/// Configuration for one modem logging session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Serial device path (e.g. "/dev/ttyUSB0" or "/dev/serial0")
    pub port: String,
    /// Serial baud rate, 8-N-1 framing
    pub baud_rate: u32,
    /// Serial inter-read timeout
    pub read_timeout: Duration,
    /// Timeout for ordinary AT commands
    pub command_timeout: Duration,
    /// Timeout for the network time query
    pub time_query_timeout: Duration,
    /// Delay between writing a command and reading the reply
    pub settle_delay: Duration,
    /// Interval between clock resync attempts
    pub resync_interval: Duration,
    /// Sleep when no input is waiting
    pub idle_poll: Duration,
    /// Per-read wait inside the event loop, bounds cancellation latency
    pub line_wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".into(),
            baud_rate: timing::DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(timing::READ_TIMEOUT_MS),
            command_timeout: Duration::from_millis(timing::COMMAND_TIMEOUT_MS),
            time_query_timeout: Duration::from_millis(timing::TIME_QUERY_TIMEOUT_MS),
            settle_delay: Duration::from_millis(timing::SETTLE_DELAY_MS),
            resync_interval: Duration::from_secs(timing::RESYNC_INTERVAL_SECS),
            idle_poll: Duration::from_millis(timing::IDLE_POLL_MS),
            line_wait: Duration::from_millis(timing::LINE_WAIT_MS),
        }
    }
}

//! Transport trait abstraction for the modem's byte channel

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// A duplex byte channel to the modem, read line by line
#[async_trait]
pub trait ModemTransport: Send {
    /// Write raw bytes and flush them to the device
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Wait up to `timeout` for the next complete line
    ///
    /// Returns `Ok(None)` if no full line arrived in time.
    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>>;

    /// Number of received bytes not yet consumed
    fn bytes_available(&self) -> io::Result<usize>;

    /// Drop everything received but not yet read
    async fn discard_input(&mut self) -> io::Result<()>;

    /// Release the device; further calls are no-ops
    async fn close(&mut self) -> io::Result<()>;

    /// Human-readable name of the device (port path)
    fn identity(&self) -> &str;
}

/// Error returned by any operation on a closed transport
pub fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is closed")
}

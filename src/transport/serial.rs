//! Serial transport implementation for the RockBLOCK modem

use crate::config::SessionConfig;
use crate::transport::traits::{closed_error, ModemTransport};
use async_trait::async_trait;
use cier_shared::LineDecoder;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, Instant};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::{debug, info};

/// Serial port wrapper implementing ModemTransport
pub struct SerialTransport {
    inner: Option<SerialStream>,
    path: String,
    decoder: LineDecoder,
    read_buf: Vec<u8>,
}

impl SerialTransport {
    /// Open the configured port with 8-N-1 framing
    pub fn open(config: &SessionConfig) -> io::Result<Self> {
        info!("[SERIAL] Opening {} at {} baud", config.port, config.baud_rate);

        let stream = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open_native_async()?;

        Ok(Self {
            inner: Some(stream),
            path: config.port.clone(),
            decoder: LineDecoder::new(),
            read_buf: vec![0u8; 1024],
        })
    }
}

#[async_trait]
impl ModemTransport for SerialTransport {
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.inner.as_mut().ok_or_else(closed_error)?;
        port.write_all(data).await?;
        port.flush().await
    }

    async fn read_line(&mut self, wait: Duration) -> io::Result<Option<String>> {
        let deadline = Instant::now() + wait;

        loop {
            match self.decoder.next_line() {
                Ok(Some(line)) => return Ok(Some(line)),
                Ok(None) => {}
                Err(e) => {
                    debug!("[SERIAL] Discarding malformed input: {}", e);
                    continue;
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let port = self.inner.as_mut().ok_or_else(closed_error)?;
            match timeout(remaining, port.read(&mut self.read_buf)).await {
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial port closed",
                    ));
                }
                Ok(Ok(n)) => self.decoder.extend(&self.read_buf[..n]),
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Ok(None),
            }
        }
    }

    fn bytes_available(&self) -> io::Result<usize> {
        let port = self.inner.as_ref().ok_or_else(closed_error)?;
        let pending = port.bytes_to_read()? as usize;
        let buffered = if self.decoder.has_line() {
            self.decoder.buffer_len()
        } else {
            0
        };
        Ok(pending + buffered)
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        let port = self.inner.as_ref().ok_or_else(closed_error)?;
        port.clear(ClearBuffer::Input)?;
        self.decoder.clear();
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        if let Some(mut port) = self.inner.take() {
            port.flush().await?;
            info!("[SERIAL] Closed {}", self.path);
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let config = SessionConfig {
            port: "/dev/does-not-exist-cier".into(),
            ..Default::default()
        };
        assert!(SerialTransport::open(&config).is_err());
    }
}

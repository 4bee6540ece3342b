//! Command engine - frames AT commands and collects their responses

use crate::transport::ModemTransport;
use cier_shared::codec::encode_command;
use cier_shared::protocol::{self, RESPONSE_OK};
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// A single AT command with its response deadline
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub text: String,
    pub timeout: Duration,
}

impl CommandRequest {
    pub fn new(text: impl Into<String>, timeout: Duration) -> Self {
        Self {
            text: text.into(),
            timeout,
        }
    }
}

/// Lines received in reply to one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResponse {
    lines: Vec<String>,
}

impl CommandResponse {
    /// All collected lines, terminator included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The terminator that ended the response, if one arrived before the deadline
    pub fn terminator(&self) -> Option<&str> {
        self.lines
            .last()
            .map(String::as_str)
            .filter(|line| protocol::is_terminator(line))
    }

    /// True if the modem answered `OK`
    pub fn is_ok(&self) -> bool {
        self.lines.iter().any(|line| line == RESPONSE_OK)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Executes request/response exchanges on a modem transport
///
/// Only one command may be in flight at a time; the engine borrows the
/// transport mutably for the whole exchange.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    settle_delay: Duration,
}

impl CommandEngine {
    /// Create a new command engine
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    /// Shorthand for [`CommandEngine::execute`] with an ad-hoc request
    pub async fn send<T>(
        &self,
        transport: &mut T,
        text: &str,
        timeout: Duration,
    ) -> io::Result<CommandResponse>
    where
        T: ModemTransport + ?Sized,
    {
        self.execute(transport, &CommandRequest::new(text, timeout))
            .await
    }

    /// Send a command and collect lines until a terminator or the deadline
    ///
    /// A timeout is not an error: the response is simply partial or empty.
    /// Only transport failures are returned as `Err`.
    pub async fn execute<T>(
        &self,
        transport: &mut T,
        request: &CommandRequest,
    ) -> io::Result<CommandResponse>
    where
        T: ModemTransport + ?Sized,
    {
        transport.discard_input().await?;
        transport.write_bytes(&encode_command(&request.text)).await?;
        debug!("[MODEM] >> {}", request.text);

        tokio::time::sleep(self.settle_delay).await;

        let deadline = Instant::now() + request.timeout;
        let mut response = CommandResponse::default();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!(
                    "[MODEM] {} timed out after {} lines",
                    request.text,
                    response.lines.len()
                );
                break;
            }

            let Some(line) = transport.read_line(remaining).await? else {
                continue;
            };
            debug!("[MODEM] << {}", line);

            let done = protocol::is_terminator(&line);
            response.lines.push(line);
            if done {
                break;
            }
        }

        Ok(response)
    }
}

impl Default for CommandEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(cier_shared::timing::SETTLE_DELAY_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::ScriptedModem;

    #[tokio::test(start_paused = true)]
    async fn test_collects_until_ok() {
        let mut modem = ScriptedModem::new().reply("AT-MSSTM", "-MSSTM: 0a1b2c3d\r\n\r\nOK\r\n");
        let engine = CommandEngine::default();

        let response = engine
            .send(&mut modem, "AT-MSSTM", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.lines(), ["-MSSTM: 0a1b2c3d", "OK"]);
        assert_eq!(response.terminator(), Some("OK"));
        assert!(response.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_terminates() {
        let mut modem = ScriptedModem::new().reply("AT+BOGUS", "ERROR\r\nOK\r\n");
        let engine = CommandEngine::default();

        let response = engine
            .send(&mut modem, "AT+BOGUS", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.lines(), ["ERROR"]);
        assert_eq!(response.terminator(), Some("ERROR"));
        assert!(!response.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_with_carriage_return() {
        let mut modem = ScriptedModem::new().reply("AT", "OK\r\n");
        let log = modem.command_log();
        let engine = CommandEngine::default();

        engine
            .send(&mut modem, "AT", Duration::from_secs(2))
            .await
            .unwrap();

        // The scripted modem strips exactly one trailing CR
        assert_eq!(log.commands(), ["AT"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_input_is_discarded() {
        let mut modem = ScriptedModem::new().reply("AT", "OK\r\n");
        modem.inject("+CIEV:0,3\r\nERROR\r\n");
        let engine = CommandEngine::default();

        let response = engine
            .send(&mut modem, "AT", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response.lines(), ["OK"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_bounded() {
        let mut modem = ScriptedModem::new().reply("AT-MSSTM", "-MSSTM: no network service\r\n");
        let engine = CommandEngine::default();
        let timeout = Duration::from_secs(5);

        let start = Instant::now();
        let response = engine.send(&mut modem, "AT-MSSTM", timeout).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(response.lines(), ["-MSSTM: no network service"]);
        assert_eq!(response.terminator(), None);
        assert!(elapsed >= timeout);
        assert!(elapsed <= timeout + Duration::from_millis(200) + Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_modem_yields_empty() {
        let mut modem = ScriptedModem::new();
        let engine = CommandEngine::default();

        let response = engine
            .send(&mut modem, "AT", Duration::from_secs(2))
            .await
            .unwrap();

        assert!(response.is_empty());
        assert_eq!(response.terminator(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_transport_is_error() {
        let mut modem = ScriptedModem::responsive();
        modem.close().await.unwrap();
        let engine = CommandEngine::default();

        let result = engine.send(&mut modem, "AT", Duration::from_secs(2)).await;
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotConnected);
    }
}

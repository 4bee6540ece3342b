//! Scripted in-memory modem used by the session tests

use crate::transport::traits::{closed_error, ModemTransport};
use async_trait::async_trait;
use cier_shared::LineDecoder;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Commands written to a [`ScriptedModem`], shared with the test
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<String>>>);

impl CommandLog {
    pub fn commands(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| *c == command).count()
    }
}

/// Modem double that answers known commands with canned replies
pub struct ScriptedModem {
    replies: HashMap<String, VecDeque<String>>,
    unsolicited: VecDeque<(String, String)>,
    rx: LineDecoder,
    log: CommandLog,
    closed: bool,
    close_calls: Arc<Mutex<usize>>,
}

impl ScriptedModem {
    pub fn new() -> Self {
        Self {
            replies: HashMap::new(),
            unsolicited: VecDeque::new(),
            rx: LineDecoder::new(),
            log: CommandLog::default(),
            closed: false,
            close_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Modem that answers the standard handshake with `OK`
    pub fn responsive() -> Self {
        Self::new()
            .reply("ATE0", "OK\r\n")
            .reply("AT", "OK\r\n")
            .reply("AT+CIER=1,1,1,1,1", "OK\r\n")
            .reply("AT+CIER=0", "OK\r\n")
    }

    /// Answer `command` with `reply` (repeats the last reply once the queue is drained)
    pub fn reply(mut self, command: &str, reply: &str) -> Self {
        self.replies
            .entry(command.to_string())
            .or_default()
            .push_back(reply.to_string());
        self
    }

    /// Emit `data` unsolicited right after `command` has been answered
    pub fn after(mut self, command: &str, data: &str) -> Self {
        self.unsolicited
            .push_back((command.to_string(), data.to_string()));
        self
    }

    pub fn command_log(&self) -> CommandLog {
        self.log.clone()
    }

    pub fn close_counter(&self) -> Arc<Mutex<usize>> {
        self.close_calls.clone()
    }

    /// Push unsolicited bytes straight into the receive buffer
    pub fn inject(&mut self, data: &str) {
        self.rx.extend(data.as_bytes());
    }
}

#[async_trait]
impl ModemTransport for ScriptedModem {
    async fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }

        let command = String::from_utf8_lossy(data)
            .trim_end_matches('\r')
            .to_string();
        self.log.0.lock().unwrap().push(command.clone());

        if let Some(queue) = self.replies.get_mut(&command) {
            let reply = if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            };
            if let Some(reply) = reply {
                self.rx.extend(reply.as_bytes());
            }
        }

        while self
            .unsolicited
            .front()
            .is_some_and(|(trigger, _)| *trigger == command)
        {
            if let Some((_, data)) = self.unsolicited.pop_front() {
                self.rx.extend(data.as_bytes());
            }
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> io::Result<Option<String>> {
        if self.closed {
            return Err(closed_error());
        }
        if let Ok(Some(line)) = self.rx.next_line() {
            return Ok(Some(line));
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    fn bytes_available(&self) -> io::Result<usize> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(self.rx.buffer_len())
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        self.rx.clear();
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            *self.close_calls.lock().unwrap() += 1;
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        "/dev/ttyMOCK0"
    }
}

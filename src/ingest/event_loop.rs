//! Event ingestion loop - time-tags `+CIEV` lines and appends them to the log

use super::sink::{format_event, LogSink};
use crate::session::{StatusEvent, StatusSender};
use crate::timesync::{ResyncController, SyncOutcome};
use crate::transport::ModemTransport;
use cier_shared::protocol::EVENT_PREFIX;
use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// How the ingestion loop ended
#[derive(Debug)]
pub enum LoopOutcome {
    /// Cancellation was requested
    Stopped { events: u64 },
    /// The transport failed
    TransportError { events: u64, error: io::Error },
    /// The log sink rejected a write
    SinkError { events: u64, error: io::Error },
}

impl LoopOutcome {
    /// Events successfully logged before the loop ended
    pub fn events(&self) -> u64 {
        match self {
            LoopOutcome::Stopped { events }
            | LoopOutcome::TransportError { events, .. }
            | LoopOutcome::SinkError { events, .. } => *events,
        }
    }
}

/// Consumes unsolicited modem lines until cancelled
///
/// Runs on the session's single task: resync exchanges happen inline between
/// polls so command responses never interleave with event capture. A resync
/// only starts once the receive buffer is drained, because the command engine
/// flushes pending input before writing.
pub struct IngestLoop {
    line_wait: Duration,
    idle_poll: Duration,
    status: StatusSender,
    events: u64,
}

impl IngestLoop {
    /// Create a new ingestion loop
    ///
    /// `line_wait` bounds each read, and with it how long a stop request can
    /// go unnoticed while a partial line is pending.
    pub fn new(line_wait: Duration, idle_poll: Duration, status: StatusSender) -> Self {
        Self {
            line_wait,
            idle_poll,
            status,
            events: 0,
        }
    }

    /// Run until `cancel` turns true or an I/O failure occurs
    pub async fn run<T, S>(
        &mut self,
        transport: &mut T,
        sink: &mut S,
        sync: &mut ResyncController,
        cancel: &watch::Receiver<bool>,
    ) -> LoopOutcome
    where
        T: ModemTransport + ?Sized,
        S: LogSink + ?Sized,
    {
        loop {
            if *cancel.borrow() {
                info!("[LOG] Stop requested after {} events", self.events);
                return LoopOutcome::Stopped {
                    events: self.events,
                };
            }

            let available = match transport.bytes_available() {
                Ok(n) => n,
                Err(error) => return self.transport_failed(error),
            };

            if available == 0 {
                if sync.is_due() {
                    let report = match sync.resync(transport).await {
                        Ok(report) => report,
                        Err(error) => return self.transport_failed(error),
                    };
                    match report.outcome {
                        SyncOutcome::Synced { modem_time, .. } => {
                            let _ = self.status.send(StatusEvent::TimeSynced { modem_time });
                        }
                        SyncOutcome::Unavailable { retained } => {
                            let _ = self.status.send(StatusEvent::TimeSyncUnavailable {
                                source: retained.source(),
                            });
                        }
                    }
                    for line in &report.events {
                        if let Err(outcome) = self.log_event(sink, sync, line) {
                            return outcome;
                        }
                    }
                    continue;
                }

                tokio::time::sleep(self.idle_poll).await;
                continue;
            }

            let line = match transport.read_line(self.line_wait).await {
                Ok(Some(line)) => line,
                Ok(None) => continue,
                Err(error) => return self.transport_failed(error),
            };

            if !line.starts_with(EVENT_PREFIX) {
                debug!("[LOG] Ignoring {:?}", line);
                continue;
            }

            if let Err(outcome) = self.log_event(sink, sync, &line) {
                return outcome;
            }
        }
    }

    fn log_event<S>(
        &mut self,
        sink: &mut S,
        sync: &ResyncController,
        line: &str,
    ) -> Result<(), LoopOutcome>
    where
        S: LogSink + ?Sized,
    {
        let entry = format_event(sync.now(), line);
        if let Err(error) = sink.write_line(&entry) {
            error!("[LOG] Could not write to log: {}", error);
            return Err(LoopOutcome::SinkError {
                events: self.events,
                error,
            });
        }

        self.events += 1;
        let _ = self.status.send(StatusEvent::EventLogged(entry));
        Ok(())
    }

    fn transport_failed(&self, error: io::Error) -> LoopOutcome {
        error!("[LOG] Transport failed: {}", error);
        LoopOutcome::TransportError {
            events: self.events,
            error,
        }
    }
}

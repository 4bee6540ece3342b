//! Resync controller - keeps the clock offset aligned with Iridium time

use super::clock::{Clock, ClockOffset};
use crate::command::CommandEngine;
use crate::transport::ModemTransport;
use chrono::{DateTime, Utc};
use cier_shared::protocol::{CMD_SYSTEM_TIME, EVENT_PREFIX};
use cier_shared::time_from_response;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Result of one resync attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncOutcome {
    /// The modem reported a valid time and the offset was refreshed
    Synced {
        modem_time: DateTime<Utc>,
        offset: ClockOffset,
    },
    /// No usable time (no network service, no reply, bad payload); offset kept
    Unavailable { retained: ClockOffset },
}

/// Everything one `AT-MSSTM` exchange produced
#[derive(Debug, Clone, PartialEq)]
pub struct ResyncReport {
    pub outcome: SyncOutcome,
    /// `+CIEV` lines that arrived while the query was in flight
    pub events: Vec<String>,
}

/// Owns the session's clock offset and refreshes it on a fixed cadence
///
/// The cadence is measured from the end of the previous attempt, so a slow
/// query pushes the next one back instead of piling up.
pub struct ResyncController {
    engine: CommandEngine,
    clock: Arc<dyn Clock>,
    offset: ClockOffset,
    query_timeout: Duration,
    interval: Duration,
    last_attempt: Instant,
}

impl ResyncController {
    /// Create a controller with a zero, system-sourced offset
    pub fn new(
        engine: CommandEngine,
        clock: Arc<dyn Clock>,
        query_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            offset: ClockOffset::system(),
            query_timeout,
            interval,
            last_attempt: Instant::now(),
        }
    }

    /// Current offset
    pub fn offset(&self) -> &ClockOffset {
        &self.offset
    }

    /// Corrected wall-clock time
    pub fn now(&self) -> DateTime<Utc> {
        self.offset.apply(self.clock.now())
    }

    /// Uncorrected local time
    pub fn local_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// True once the resync interval has elapsed since the last attempt
    pub fn is_due(&self) -> bool {
        self.last_attempt.elapsed() > self.interval
    }

    /// Query the modem time and refresh the offset
    ///
    /// Any failure to obtain a time leaves the offset untouched. Only
    /// transport failures are returned as `Err`. Event lines interleaved
    /// with the reply are handed back so the caller can still log them.
    pub async fn resync<T>(&mut self, transport: &mut T) -> io::Result<ResyncReport>
    where
        T: ModemTransport + ?Sized,
    {
        let result = self
            .engine
            .send(transport, CMD_SYSTEM_TIME, self.query_timeout)
            .await;
        self.last_attempt = Instant::now();

        let response = result?;
        let events: Vec<String> = response
            .lines()
            .iter()
            .filter(|line| line.starts_with(EVENT_PREFIX))
            .cloned()
            .collect();

        let outcome = match time_from_response(response.lines()) {
            Some(modem_time) => {
                self.offset = ClockOffset::from_sync(modem_time, self.clock.now(), self.last_attempt);
                info!(
                    "[SYNC] Iridium time {} (offset {:+.3}s)",
                    modem_time.format("%Y-%m-%d %H:%M:%S"),
                    self.offset.offset_seconds()
                );
                SyncOutcome::Synced {
                    modem_time,
                    offset: self.offset,
                }
            }
            None => {
                match self.offset.last_synced_at() {
                    Some(at) => warn!(
                        "[SYNC] Iridium time unavailable, keeping offset from {}s ago",
                        at.elapsed().as_secs()
                    ),
                    None => warn!(
                        "[SYNC] Iridium time unavailable, keeping {} time",
                        self.offset.source()
                    ),
                }
                SyncOutcome::Unavailable {
                    retained: self.offset,
                }
            }
        };

        Ok(ResyncReport { outcome, events })
    }
}

//! Session lifecycle - modem handshake, logging run and guaranteed shutdown

use super::error::SessionError;
use super::status::{StatusEvent, StatusSender};
use crate::command::CommandEngine;
use crate::config::SessionConfig;
use crate::ingest::{IngestLoop, LogHeader, LogSink, LoopOutcome};
use crate::timesync::{Clock, ClockOffset, ResyncController, SyncOutcome, TimeSource};
use crate::transport::ModemTransport;
use cier_shared::protocol::{CMD_ECHO_OFF, CMD_EVENTS_OFF, CMD_EVENTS_ON, CMD_PROBE};
use cier_shared::{SessionEvent, SessionState, SessionStateMachine, TransitionResult};
use std::io;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Summary of a session that stopped on request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub events_logged: u64,
    pub time_source: TimeSource,
}

/// Owns the transport for one logging session
///
/// Shutdown (disable reporting, close transport) runs exactly once, whatever
/// ends the session.
pub struct Session<T: ModemTransport> {
    config: SessionConfig,
    transport: T,
    engine: CommandEngine,
    sync: ResyncController,
    fsm: SessionStateMachine,
    status: StatusSender,
}

impl<T: ModemTransport> Session<T> {
    /// Wrap an already opened transport
    pub fn new(config: SessionConfig, transport: T, clock: Arc<dyn Clock>, status: StatusSender) -> Self {
        let engine = CommandEngine::new(config.settle_delay);
        let sync = ResyncController::new(
            engine.clone(),
            clock,
            config.time_query_timeout,
            config.resync_interval,
        );

        Self {
            config,
            transport,
            engine,
            sync,
            fsm: SessionStateMachine::new(),
            status,
        }
    }

    pub fn state(&self) -> SessionState {
        self.fsm.state()
    }

    pub fn offset(&self) -> &ClockOffset {
        self.sync.offset()
    }

    /// Run the whole session: handshake, log header, reporting, ingestion, shutdown
    ///
    /// `open_sink` is called once, after the initial time sync, so the header
    /// can record the time source.
    pub async fn run<S, F>(
        &mut self,
        open_sink: F,
        cancel: watch::Receiver<bool>,
    ) -> Result<SessionReport, SessionError>
    where
        S: LogSink,
        F: FnOnce() -> io::Result<S>,
    {
        let result = self.run_until_stopped(open_sink, &cancel).await;

        if let Err(e) = &result {
            self.transition(SessionEvent::Failed {
                reason: e.to_string(),
            });
            let _ = self.status.send(StatusEvent::Fatal {
                reason: e.to_string(),
            });
        }

        self.shutdown().await;
        result
    }

    async fn run_until_stopped<S, F>(
        &mut self,
        open_sink: F,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SessionReport, SessionError>
    where
        S: LogSink,
        F: FnOnce() -> io::Result<S>,
    {
        self.startup().await?;

        let mut sink = open_sink().map_err(|e| SessionError::sink(0, e))?;
        let header = LogHeader {
            started_at: self.sync.local_now(),
            port: self.transport.identity().to_string(),
            baud_rate: self.config.baud_rate,
            time_source: self.sync.offset().source(),
        };
        header
            .write_to(&mut sink)
            .map_err(|e| SessionError::sink(0, e))?;

        self.enable_reporting().await?;

        let mut ingest = IngestLoop::new(self.config.line_wait, self.config.idle_poll, self.status.clone());
        let outcome = ingest
            .run(&mut self.transport, &mut sink, &mut self.sync, cancel)
            .await;

        info!("[SESSION] Ingestion ended after {} events", outcome.events());
        if let Err(e) = sink.close() {
            warn!("[LOG] Closing log failed: {}", e);
        }

        match outcome {
            LoopOutcome::Stopped { events } => {
                self.transition(SessionEvent::StopRequested);
                let _ = self.status.send(StatusEvent::Stopped { events });
                Ok(SessionReport {
                    events_logged: events,
                    time_source: self.sync.offset().source(),
                })
            }
            LoopOutcome::TransportError { error, .. } => Err(SessionError::TransportUnavailable(error)),
            LoopOutcome::SinkError { events, error } => Err(SessionError::sink(events, error)),
        }
    }

    /// Echo off, probe, initial time sync
    pub async fn startup(&mut self) -> Result<(), SessionError> {
        info!("[MODEM] Initializing modem on {}", self.transport.identity());

        let echo = self
            .engine
            .send(&mut self.transport, CMD_ECHO_OFF, self.config.command_timeout)
            .await?;
        if !echo.is_ok() {
            warn!("[MODEM] Echo suppression not acknowledged");
            let _ = self.status.send(StatusEvent::EchoSuppressFailed);
        }

        let probe = self
            .engine
            .send(&mut self.transport, CMD_PROBE, self.config.command_timeout)
            .await?;
        if !probe.is_ok() {
            if probe.is_empty() {
                warn!("[MODEM] No reply to {}", CMD_PROBE);
            } else {
                warn!("[MODEM] {} answered {:?}", CMD_PROBE, probe.terminator());
            }
            return Err(SessionError::ModemUnresponsive);
        }
        info!("[MODEM] Modem responding");
        self.transition(SessionEvent::ModemResponding);
        let _ = self.status.send(StatusEvent::ModemResponding);

        match self.sync.resync(&mut self.transport).await?.outcome {
            SyncOutcome::Synced { modem_time, .. } => {
                let _ = self.status.send(StatusEvent::TimeSynced { modem_time });
            }
            SyncOutcome::Unavailable { retained } => {
                warn!("[SYNC] Could not get Iridium time (using system time)");
                let _ = self.status.send(StatusEvent::TimeSyncUnavailable {
                    source: retained.source(),
                });
            }
        }

        Ok(())
    }

    /// Turn on `+CIEV` reporting; called right before the ingestion loop
    async fn enable_reporting(&mut self) -> Result<(), SessionError> {
        let response = self
            .engine
            .send(&mut self.transport, CMD_EVENTS_ON, self.config.command_timeout)
            .await?;
        if !response.is_ok() {
            return Err(SessionError::ReportingEnableFailed);
        }

        info!("[MODEM] CIER mode enabled");
        self.transition(SessionEvent::ReportingEnabled);
        let _ = self.status.send(StatusEvent::ReportingEnabled);
        Ok(())
    }

    /// Disable reporting and close the transport
    ///
    /// Safe to call repeatedly; only the first call touches the modem.
    pub async fn shutdown(&mut self) {
        if self.fsm.is_closed() {
            debug!("[SESSION] Already closed");
            return;
        }
        if self.fsm.is_active() {
            self.transition(SessionEvent::StopRequested);
        }

        info!("[MODEM] Disabling CIER mode");
        if let Err(e) = self
            .engine
            .send(&mut self.transport, CMD_EVENTS_OFF, self.config.command_timeout)
            .await
        {
            debug!("[MODEM] Disable reporting failed: {}", e);
        }

        if let Err(e) = self.transport.close().await {
            warn!("[SESSION] Closing transport failed: {}", e);
        }

        self.transition(SessionEvent::ShutdownComplete);
        let _ = self.status.send(StatusEvent::ShutdownComplete);
    }

    fn transition(&mut self, event: SessionEvent) {
        let from = self.fsm.state();
        match self.fsm.process_event(event) {
            TransitionResult::Success(to) if from != to => {
                debug!("[SESSION] {} -> {}", from, to);
            }
            TransitionResult::Success(_) => {}
            TransitionResult::Aborted { from, reason } => {
                error!("[SESSION] Aborted while {}: {}", from, reason);
            }
            TransitionResult::Invalid { from, event } => {
                debug!("[SESSION] Ignoring {:?} while {}", event, from);
            }
        }
    }
}

mod command;
mod config;
mod ingest;
mod session;
mod timesync;
mod transport;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Utc};
use clap::Parser;
use config::SessionConfig;
use ingest::FileSink;
use session::{status_channel, Session, SessionError, SessionReport, StatusEvent, StatusReceiver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use timesync::{Clock, SystemClock};
use tokio::sync::watch;
use transport::{PortInfo, SerialTransport};

use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Earliest plausible system year; anything before means no RTC and no NTP
const MIN_PLAUSIBLE_YEAR: i32 = 2024;

#[derive(Parser, Debug)]
#[command(name = "cier-logger", version)]
#[command(about = "RockBLOCK CIER logger: timestamps Iridium +CIEV events to a log file")]
#[command(after_help = "Output format (Site Survey Tool v4.1 importer):\n\n  \
    [2025-12-17 09:04:33.123] +CIEV:0,3\n  \
    [2025-12-17 09:04:33.456] +CIEV:3,109,24,1,3716,-824,6052")]
struct Cli {
    /// Serial port (e.g. /dev/ttyUSB0, /dev/serial0)
    #[arg(short, long, required_unless_present = "list_ports")]
    port: Option<String>,

    /// Output file path (default: cier_log_<timestamp>.log)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Baud rate
    #[arg(short, long, default_value_t = cier_shared::timing::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// List available serial ports and exit
    #[arg(short, long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    if cli.list_ports {
        list_ports();
        return Ok(());
    }

    let Some(port) = cli.port else {
        bail!("No serial port given (use --port or --list-ports)");
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let now = clock.now();
    if !system_time_plausible(now) {
        warn!(
            "System time appears incorrect ({})",
            now.format("%Y-%m-%d %H:%M:%S")
        );
        warn!("  Sync with NTP (sudo timedatectl set-ntp true) or set it manually");
        warn!("  Timestamps will use Iridium time if available");
    }

    let output = resolve_output_path(cli.output, clock.now());
    let config = SessionConfig {
        port,
        baud_rate: cli.baud,
        ..Default::default()
    };

    info!("Configuration:");
    info!("  Serial Port: {}", config.port);
    info!("  Baud Rate:   {}", config.baud_rate);
    info!("  Output File: {}", output.display());

    let transport = SerialTransport::open(&config)
        .map_err(SessionError::TransportUnavailable)
        .with_context(|| format!("Could not open serial port {}", config.port))?;
    info!("Connected to {}", config.port);

    // Ctrl+C stops the loop; repeated signals collapse into one stop request
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stopping logger...");
            let _ = cancel_tx.send(true);
        }
    });

    let (status_tx, status_rx) = status_channel();
    let status_task = tokio::spawn(handle_status_events(status_rx));

    let mut session = Session::new(config, transport, clock, status_tx);
    let log_path = output.clone();
    let result: Result<SessionReport, SessionError> = session
        .run(move || FileSink::create(&log_path), cancel_rx)
        .await;

    debug!("[SESSION] Final state: {}", session.state());
    info!(
        "Clock offset at stop: {:+.3}s ({} time)",
        session.offset().offset_seconds(),
        session.offset().source()
    );
    drop(session);
    let _ = status_task.await;

    match result {
        Ok(report) => {
            info!("Total events logged: {}", report.events_logged);
            info!("Log saved to: {}", output.display());
            Ok(())
        }
        Err(e) => {
            if output.exists() {
                info!("Log saved to: {}", output.display());
            }
            Err(e.into())
        }
    }
}

/// Print candidate serial ports
fn list_ports() {
    let ports: Vec<PortInfo> = transport::find_serial_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }

    println!("Available serial ports:");
    for p in ports {
        println!("  {} - {} [{}]", p.path, p.description, p.kind);
    }
}

/// False when the system clock is obviously unset
fn system_time_plausible(now: DateTime<Utc>) -> bool {
    now.year() >= MIN_PLAUSIBLE_YEAR
}

/// Pick the log file path; an explicit path is used as given
fn resolve_output_path(output: Option<PathBuf>, now: DateTime<Utc>) -> PathBuf {
    output.unwrap_or_else(|| {
        Path::new(".").join(format!("cier_log_{}.log", now.format("%Y%m%d_%H%M%S")))
    })
}

/// Mirror session status to the console
async fn handle_status_events(mut status_rx: StatusReceiver) {
    while let Some(event) = status_rx.recv().await {
        match event {
            StatusEvent::EchoSuppressFailed => {
                warn!("  !! Echo suppression failed, continuing");
            }
            StatusEvent::ModemResponding => {
                info!("  OK Modem responding");
            }
            StatusEvent::TimeSynced { modem_time } => {
                info!("  OK Iridium time: {}", modem_time.format("%Y-%m-%d %H:%M:%S"));
            }
            StatusEvent::TimeSyncUnavailable { source } => {
                warn!("  !! Could not get Iridium time (using {} time)", source);
            }
            StatusEvent::ReportingEnabled => {
                info!("  OK CIER mode enabled");
                info!("CIER Logger Active - Press Ctrl+C to stop");
            }
            StatusEvent::EventLogged(line) => {
                println!("{}", line);
            }
            StatusEvent::Stopped { events } => {
                info!("Logger stopped after {} events", events);
            }
            StatusEvent::Fatal { reason } => {
                error!("ERROR: {}", reason);
            }
            StatusEvent::ShutdownComplete => {
                info!("CIER mode disabled, port closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_output_name() {
        let now = Utc.with_ymd_and_hms(2025, 12, 17, 9, 0, 5).unwrap();
        let path = resolve_output_path(None, now);
        assert_eq!(path, Path::new(".").join("cier_log_20251217_090005.log"));
    }

    #[test]
    fn test_explicit_output_used_as_given() {
        let now = Utc.with_ymd_and_hms(2025, 12, 17, 9, 0, 5).unwrap();
        assert_eq!(
            resolve_output_path(Some("/media/sd/survey.log".into()), now),
            PathBuf::from("/media/sd/survey.log")
        );
        assert_eq!(
            resolve_output_path(Some("survey.txt".into()), now),
            PathBuf::from("survey.txt")
        );
        assert_eq!(
            resolve_output_path(Some("survey".into()), now),
            PathBuf::from("survey")
        );
    }

    #[test]
    fn test_system_time_plausibility() {
        assert!(system_time_plausible(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        assert!(system_time_plausible(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        assert!(!system_time_plausible(Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap()));
        assert!(!system_time_plausible(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["cier-logger", "-p", "/dev/ttyUSB0", "-o", "survey.log"]).unwrap();
        assert_eq!(cli.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.baud, 19_200);
        assert!(!cli.list_ports);

        let cli = Cli::try_parse_from(["cier-logger", "--list-ports"]).unwrap();
        assert!(cli.list_ports);

        assert!(Cli::try_parse_from(["cier-logger"]).is_err());
    }
}

//! Append-only log sink and the CIER log file format

use crate::timesync::TimeSource;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Timestamp format of event lines, milliseconds truncated
pub const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Timestamp format of the header
pub const HEADER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Line-oriented, append-only destination for the event log
pub trait LogSink: Send {
    /// Append one line and flush it to the backing store
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Release the destination; further writes fail
    fn close(&mut self) -> io::Result<()>;
}

/// Log file on disk, flushed after every line
pub struct FileSink {
    file: Option<File>,
    path: PathBuf,
}

impl FileSink {
    /// Create (or truncate) the log file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            file: Some(file),
            path,
        })
    }
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let file = self.file.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "log file is closed")
        })?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
            debug!("[LOG] Closed {}", self.path.display());
        }
        Ok(())
    }
}

/// Session details recorded at the top of the log
#[derive(Debug, Clone)]
pub struct LogHeader {
    pub started_at: DateTime<Utc>,
    pub port: String,
    pub baud_rate: u32,
    pub time_source: TimeSource,
}

impl LogHeader {
    /// The `#`-prefixed comment block
    pub fn lines(&self) -> [String; 4] {
        [
            format!("# CIER Log - {}", self.started_at.format(HEADER_TIMESTAMP_FORMAT)),
            format!("# Port: {} @ {} baud", self.port, self.baud_rate),
            format!("# Time source: {}", self.time_source),
            "#".to_string(),
        ]
    }

    pub fn write_to<S: LogSink + ?Sized>(&self, sink: &mut S) -> io::Result<()> {
        for line in self.lines() {
            sink.write_line(&line)?;
        }
        Ok(())
    }
}

/// Format one event line: `[YYYY-MM-DD HH:MM:SS.mmm] +CIEV:...`
pub fn format_event(timestamp: DateTime<Utc>, line: &str) -> String {
    format!("[{}] {}", timestamp.format(EVENT_TIMESTAMP_FORMAT), line)
}

/// In-memory sink that can be told to fail on a given event
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    fail_on_event: Option<usize>,
    events_seen: usize,
}

#[cfg(test)]
impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th (1-based) non-header write
    pub fn failing_on_event(n: usize) -> Self {
        Self {
            fail_on_event: Some(n),
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn event_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|l| !l.starts_with('#'))
            .collect()
    }
}

#[cfg(test)]
impl LogSink for MemorySink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        if !line.starts_with('#') {
            self.events_seen += 1;
            if Some(self.events_seen) == self.fail_on_event {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_event_format() {
        let ts = Utc.with_ymd_and_hms(2025, 12, 17, 9, 4, 33).unwrap() + TimeDelta::microseconds(123_999);
        assert_eq!(
            format_event(ts, "+CIEV:0,3"),
            "[2025-12-17 09:04:33.123] +CIEV:0,3"
        );
    }

    #[test]
    fn test_event_format_whole_second() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            format_event(ts, "+CIEV:3,109,24,1,3716,-824,6052"),
            "[2025-01-02 03:04:05.000] +CIEV:3,109,24,1,3716,-824,6052"
        );
    }

    #[test]
    fn test_header_lines() {
        let header = LogHeader {
            started_at: Utc.with_ymd_and_hms(2025, 12, 17, 9, 0, 0).unwrap(),
            port: "/dev/ttyUSB0".into(),
            baud_rate: 19200,
            time_source: TimeSource::Iridium,
        };
        assert_eq!(
            header.lines(),
            [
                "# CIER Log - 2025-12-17 09:00:00",
                "# Port: /dev/ttyUSB0 @ 19200 baud",
                "# Time source: Iridium",
                "#",
            ]
        );
    }

    #[test]
    fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cier.log");

        let mut sink = FileSink::create(&path).unwrap();
        sink.write_line("# CIER Log").unwrap();
        sink.write_line("[2025-12-17 09:04:33.123] +CIEV:0,3").unwrap();

        // Visible on disk before close
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "# CIER Log\n[2025-12-17 09:04:33.123] +CIEV:0,3\n");

        sink.close().unwrap();
        assert!(sink.write_line("late").is_err());
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_file_sink_bad_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("cier.log");
        assert!(FileSink::create(path).is_err());
    }
}

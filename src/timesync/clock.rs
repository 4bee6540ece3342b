//! Wall-clock source and the modem/system clock offset

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

/// Source of local wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The host's system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where event timestamps come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// System clock corrected by the Iridium network time
    Iridium,
    /// Uncorrected system clock
    System,
}

impl std::fmt::Display for TimeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSource::Iridium => write!(f, "Iridium"),
            TimeSource::System => write!(f, "System"),
        }
    }
}

/// Difference between Iridium time and the local clock at the last good sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOffset {
    offset: TimeDelta,
    source: TimeSource,
    last_synced_at: Option<Instant>,
}

impl Default for ClockOffset {
    fn default() -> Self {
        Self::system()
    }
}

impl ClockOffset {
    /// Zero offset, system clock source
    pub fn system() -> Self {
        Self {
            offset: TimeDelta::zero(),
            source: TimeSource::System,
            last_synced_at: None,
        }
    }

    /// Offset from a successful Iridium time query
    pub fn from_sync(modem_time: DateTime<Utc>, local_now: DateTime<Utc>, at: Instant) -> Self {
        Self {
            offset: modem_time - local_now,
            source: TimeSource::Iridium,
            last_synced_at: Some(at),
        }
    }

    /// Offset as fractional seconds
    pub fn offset_seconds(&self) -> f64 {
        match self.offset.num_microseconds() {
            Some(us) => us as f64 / 1_000_000.0,
            None => self.offset.num_milliseconds() as f64 / 1000.0,
        }
    }

    pub fn source(&self) -> TimeSource {
        self.source
    }

    pub fn last_synced_at(&self) -> Option<Instant> {
        self.last_synced_at
    }

    /// Correct a local timestamp
    pub fn apply(&self, local: DateTime<Utc>) -> DateTime<Utc> {
        local + self.offset
    }
}

/// Clock frozen at a given instant
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_system_default() {
        let offset = ClockOffset::default();
        assert_eq!(offset.source(), TimeSource::System);
        assert_eq!(offset.offset_seconds(), 0.0);
        assert!(offset.last_synced_at().is_none());
    }

    #[tokio::test]
    async fn test_offset_from_sync() {
        let local = Utc.with_ymd_and_hms(2025, 12, 17, 9, 0, 0).unwrap();
        let modem = local + TimeDelta::milliseconds(-2_500);

        let offset = ClockOffset::from_sync(modem, local, Instant::now());
        assert_eq!(offset.source(), TimeSource::Iridium);
        assert_eq!(offset.offset_seconds(), -2.5);
        assert_eq!(offset.apply(local), modem);
    }

    #[test]
    fn test_source_display() {
        assert_eq!(TimeSource::Iridium.to_string(), "Iridium");
        assert_eq!(TimeSource::System.to_string(), "System");
    }
}

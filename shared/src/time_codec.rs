//! Iridium system time codec
//!
//! `AT-MSSTM` reports the Iridium system time as a hexadecimal count of
//! 90 ms ticks since the ERA2 epoch (2014-05-11 14:23:55 UTC).

use chrono::{DateTime, TimeDelta, Utc};

use crate::protocol::{MSSTM_MARKER, NO_NETWORK_SERVICE};

/// ERA2 epoch as seconds since the Unix epoch
pub const ERA2_EPOCH_UNIX_SECS: i64 = 1_399_818_235;

/// Length of one Iridium system time tick
pub const TICK_MS: u64 = 90;

/// The ERA2 epoch instant
pub fn era2_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(ERA2_EPOCH_UNIX_SECS)
}

/// A decoded `AT-MSSTM` value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemTimeSample {
    /// Tick count as reported by the modem (0 when unparseable)
    pub raw_ticks: u64,
    /// Absolute time, absent when the value could not be decoded
    pub decoded_utc: Option<DateTime<Utc>>,
}

impl ModemTimeSample {
    fn absent() -> Self {
        Self {
            raw_ticks: 0,
            decoded_utc: None,
        }
    }
}

/// Decode a hexadecimal tick count into absolute time
///
/// Never fails: malformed or out-of-range input yields a sample without
/// `decoded_utc`.
pub fn decode(hex_ticks: &str) -> ModemTimeSample {
    let Ok(raw_ticks) = u64::from_str_radix(hex_ticks.trim(), 16) else {
        return ModemTimeSample::absent();
    };

    let decoded_utc = raw_ticks
        .checked_mul(TICK_MS)
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|elapsed| era2_epoch().checked_add_signed(elapsed));

    ModemTimeSample {
        raw_ticks,
        decoded_utc,
    }
}

/// Extract the hex payload from a `-MSSTM:` reply line
///
/// Returns `None` if the line is not a time reply, the payload is empty, or
/// the modem reported no network service.
pub fn parse_msstm_line(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(MSSTM_MARKER)?;
    let payload = rest.split(':').next()?.trim();

    if payload.is_empty() || payload == NO_NETWORK_SERVICE {
        return None;
    }
    Some(payload)
}

/// Find and decode the system time in a full `AT-MSSTM` response
pub fn time_from_response<S: AsRef<str>>(lines: &[S]) -> Option<DateTime<Utc>> {
    lines
        .iter()
        .filter_map(|line| parse_msstm_line(line.as_ref()))
        .map(decode)
        .find_map(|sample| sample.decoded_utc)
}

//! Unsolicited event ingestion
//!
//! This module handles:
//! - Filtering `+CIEV` indicator events from the modem's line stream
//! - Time-tagging them with the Iridium-corrected clock
//! - Appending them to the log with a flush per line

mod event_loop;
mod sink;

pub use event_loop::{IngestLoop, LoopOutcome};
#[cfg(test)]
pub use sink::MemorySink;
pub use sink::{FileSink, LogHeader, LogSink};

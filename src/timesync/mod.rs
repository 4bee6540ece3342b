//! Iridium time synchronization
//!
//! Maintains the offset between the modem's network time and the local
//! clock so every logged event carries Iridium-aligned time.

mod clock;
mod resync;

pub use clock::{Clock, ClockOffset, SystemClock, TimeSource};
#[cfg(test)]
pub use clock::FixedClock;
pub use resync::{ResyncController, SyncOutcome};

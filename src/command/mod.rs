//! AT command/response exchange with the modem
//!
//! This module handles:
//! - Framing outgoing commands with a carriage return
//! - Draining stale input before every send
//! - Collecting reply lines until a terminator or a deadline

mod engine;

pub use engine::CommandEngine;

//! Session lifecycle management
//!
//! This module handles:
//! - The startup handshake (echo off, probe, initial time sync)
//! - Writing the log header and enabling event reporting
//! - Running the ingestion loop until cancelled
//! - Disabling reporting and closing the transport on every exit path

mod error;
mod manager;
mod status;

pub use error::SessionError;
pub use manager::{Session, SessionReport};
pub use status::{status_channel, StatusEvent, StatusReceiver, StatusSender};

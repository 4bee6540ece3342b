//! Line codec for the modem's text protocol
//!
//! Outgoing commands are framed as:
//! ```text
//! [ N bytes: ASCII command ][ 0x0D ]
//! ```
//!
//! Incoming data is a stream of `\r\n` separated lines. Bytes that are not
//! printable ASCII are replaced so line noise never aborts decoding.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::protocol::COMMAND_TERMINATOR;

/// Longest line accepted before the buffer is discarded as noise
pub const MAX_LINE_LENGTH: usize = 1024;

/// Substitute for bytes outside printable ASCII
pub const REPLACEMENT_CHAR: char = '?';

/// Errors that can occur while decoding lines
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("Line too long: {0} bytes without terminator (max: {MAX_LINE_LENGTH})")]
    LineTooLong(usize),
}

/// Encode a command into a carriage-return terminated byte buffer
pub fn encode_command(command: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(command.len() + 1);
    buf.put_slice(command.as_bytes());
    buf.put_u8(COMMAND_TERMINATOR);
    buf.freeze()
}

/// Convert raw bytes to text, replacing anything that is not printable ASCII
pub fn sanitize_ascii(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                REPLACEMENT_CHAR
            }
        })
        .collect()
}

fn is_line_break(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

/// Try to decode the next non-empty line from a buffer
///
/// Returns:
/// - `Ok(Some(line))` with the trimmed line if one was complete
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the pending data exceeded [`MAX_LINE_LENGTH`]; the buffer is cleared
pub fn decode_line(buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
    loop {
        let Some(pos) = buf.iter().position(|&b| is_line_break(b)) else {
            if buf.len() > MAX_LINE_LENGTH {
                let len = buf.len();
                buf.clear();
                return Err(CodecError::LineTooLong(len));
            }
            return Ok(None);
        };

        let raw = buf.split_to(pos);
        while buf.first().is_some_and(|&b| is_line_break(b)) {
            buf.advance(1);
        }

        let line = sanitize_ascii(&raw);
        let line = line.trim();
        if !line.is_empty() {
            return Ok(Some(line.to_string()));
        }
    }
}

/// Decoder state for streaming line decoding
#[derive(Debug, Default)]
pub struct LineDecoder {
    /// Partial line data being accumulated
    buffer: BytesMut,
}

impl LineDecoder {
    /// Create a new line decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next line from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete lines
    pub fn next_line(&mut self) -> Result<Option<String>, CodecError> {
        decode_line(&mut self.buffer)
    }

    /// True if a line break is buffered
    pub fn has_line(&self) -> bool {
        self.buffer.iter().any(|&b| is_line_break(b))
    }

    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get the current buffer length
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}

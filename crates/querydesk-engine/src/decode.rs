//! Stream event decoding.
//!
//! The backend answers a turn submission with newline-delimited JSON events.
//! Decoding is kept as a pure function so it can be tested without a server.

use serde::Deserialize;

use querydesk_core::error::Result;

/// One decoded event from the response stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of assistant content.
    Delta { content: String },
    /// The completion signal terminating a successful stream.
    Done,
    /// The error signal terminating a failed stream.
    Error { message: String },
}

/// Decodes one line of the response stream.
///
/// Blank lines are keep-alive padding and decode to `None`.
///
/// # Errors
///
/// Returns a serialization error for non-blank lines that are not a valid
/// event.
pub fn decode_stream_line(line: &str) -> Result<Option<StreamEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let event = serde_json::from_str(trimmed)?;
    Ok(Some(event))
}

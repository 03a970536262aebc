//! Error types for frame decoding.

use thiserror::Error;

/// Error type for frame decoding.
///
/// Frame-level variants are returned to the caller, which logs them and
/// keeps the stream alive: no decode failure terminates the read loop.
/// Event-level failures never surface here at all; they are collected,
/// warned about, and skipped inside the decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Frame is not parseable JSON.
    #[error("malformed frame: {source} (payload: {excerpt})")]
    Frame {
        /// Parser failure.
        #[source]
        source: serde_json::Error,
        /// Truncated offending payload, for diagnostics.
        excerpt: String,
    },

    /// Frame parsed but is neither a JSON object nor an array of objects.
    #[error("unsupported frame shape (payload: {excerpt})")]
    UnsupportedFrame {
        /// Truncated offending payload, for diagnostics.
        excerpt: String,
    },

    /// A single event inside a frame could not be decoded.
    ///
    /// Used internally for per-event bookkeeping; `decode` never returns it.
    #[error("dropped {context} event: {reason} (payload: {excerpt})")]
    Event {
        /// Which event kind was being decoded.
        context: &'static str,
        /// Why the event was dropped.
        reason: String,
        /// Truncated offending payload, for diagnostics.
        excerpt: String,
    },
}

/// Truncates a payload for inclusion in logs and errors.
#[must_use]
pub(crate) fn excerpt(raw: &str) -> String {
    const MAX: usize = 160;
    if raw.len() <= MAX {
        raw.to_string()
    } else {
        let mut end = MAX;
        while !raw.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &raw[..end])
    }
}

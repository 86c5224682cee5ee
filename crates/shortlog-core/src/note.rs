//! In-band console notes.
//!
//! A note is a serializable value hidden inside log text:
//!
//! ```text
//! ESC [8m ha: <base64(json)> ESC [0m
//! ```
//!
//! The leading escape conceals the payload on ANSI terminals and the trailing
//! reset ends the concealment. The encoded string is what the scanner looks
//! for verbatim; [`ConsoleNotePreamble`] tells it where notes may start.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use memchr::memmem;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::marker::PreambleLocator;

/// Bytes that open every note.
pub const PREAMBLE: &[u8] = b"\x1b[8mha:";

/// Bytes that close every note.
pub const POSTAMBLE: &[u8] = b"\x1b[0m";

/// Errors from encoding or decoding a note.
#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    /// The value could not be serialized, or the payload is not the expected JSON.
    #[error("note payload JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload is not valid base64.
    #[error("note payload is not base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The string is not framed by the note preamble and postamble.
    #[error("not a console note: missing {0}")]
    Framing(&'static str),
}

/// Encode `value` as a console note string.
///
/// # Errors
///
/// Returns [`NoteError::Json`] if `value` cannot be serialized.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, NoteError> {
    let json = serde_json::to_vec(value)?;
    let mut out = String::with_capacity(PREAMBLE.len() + json.len() * 4 / 3 + 4 + POSTAMBLE.len());
    out.push_str("\x1b[8mha:");
    STANDARD.encode_string(json, &mut out);
    out.push_str("\x1b[0m");
    Ok(out)
}

/// Decode a note produced by [`encode`].
///
/// # Errors
///
/// Returns [`NoteError::Framing`] when the preamble or postamble is missing,
/// and a payload error when the body is not base64-encoded JSON for `T`.
pub fn decode<T: DeserializeOwned>(note: &str) -> Result<T, NoteError> {
    let body = note
        .as_bytes()
        .strip_prefix(PREAMBLE)
        .ok_or(NoteError::Framing("preamble"))?
        .strip_suffix(POSTAMBLE)
        .ok_or(NoteError::Framing("postamble"))?;
    let json = STANDARD.decode(body)?;
    Ok(serde_json::from_slice(&json)?)
}

/// Remove every complete note from `text`.
///
/// An opened note with no postamble is kept as-is; it may be the start of a
/// note cut off by the caller.
#[must_use]
pub fn remove_notes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(start) = memmem::find(&bytes[pos..], PREAMBLE).map(|i| i + pos) {
        let body = start + PREAMBLE.len();
        let Some(end) = memmem::find(&bytes[body..], POSTAMBLE).map(|i| i + body) else {
            break;
        };
        // Both delimiters are ASCII, so these are char boundaries.
        out.push_str(&text[pos..start]);
        pos = end + POSTAMBLE.len();
    }

    out.push_str(&text[pos..]);
    out
}

/// Locates [`PREAMBLE`] occurrences for the marker scanner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotePreamble;

impl PreambleLocator for ConsoleNotePreamble {
    fn find_preamble(&self, buf: &[u8], from: usize) -> Option<usize> {
        let tail = buf.get(from..)?;
        memmem::find(tail, PREAMBLE).map(|i| i + from)
    }
}

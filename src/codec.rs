//! Value codec
//!
//! Converts between the caller's semantic value ([`serde_json::Value`]) and
//! the text form persisted in the backing table.
//!
//! ## Stored Format
//!
//! Every stored value is one tag byte followed by the payload:
//!
//! ```text
//! ┌─────────┬──────────────────────────────┐
//! │ Tag (1) │          Payload             │
//! └─────────┴──────────────────────────────┘
//! ```
//!
//! - `s`: the payload is the raw bytes of a string, with no quoting or
//!   escaping. Plain strings are stored with one byte of overhead.
//! - `j`: the payload is JSON text (numbers, booleans, null, arrays,
//!   objects). Object key order is not guaranteed to survive a round trip.
//!
//! The tag makes the round trip exact: a stored string that happens to look
//! like JSON (`"123"`, `"{\"a\":1}"`) decodes back to the same string, never
//! to a number or an object.
//!
//! Decoding is permissive and never fails. Unknown tags and malformed JSON
//! payloads come back as raw strings, so rows written by other tools remain
//! readable.

use serde_json::Value;

/// Tag byte for raw string payloads
pub const TAG_STRING: u8 = b's';

/// Tag byte for JSON payloads
pub const TAG_JSON: u8 = b'j';

/// Encode a semantic value to its stored text form
pub fn encode(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let mut text = String::with_capacity(1 + s.len());
            text.push(TAG_STRING as char);
            text.push_str(s);
            text
        }
        // Display on serde_json::Value renders canonical JSON text
        other => format!("{}{}", TAG_JSON as char, other),
    }
}

/// Decode stored text back to a semantic value
///
/// Never fails: text that is not a well-formed tagged value decodes as a
/// raw string.
pub fn decode(text: &str) -> Value {
    match text.as_bytes().first() {
        Some(&TAG_STRING) => Value::String(text[1..].to_string()),
        Some(&TAG_JSON) => serde_json::from_str(&text[1..])
            .unwrap_or_else(|_| Value::String(text[1..].to_string())),
        _ => Value::String(text.to_string()),
    }
}

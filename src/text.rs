//! The `text` module provides [`Text`], the ASCII-with-escapes decoding used for the text-bearing
//! meta events (`TEXT`, `COPYRIGHT`, `TRACK_NAME`, ...). Unlike the reference crate's `Text` type,
//! which stores a best-effort UTF-8 `String` and falls back to raw bytes, this type is always
//! constructible from any byte slice: printable ASCII round-trips as itself, and any other byte is
//! preserved losslessly as a `\xNN` escape. The raw bytes are always still available via
//! [`Text::as_bytes`], so nothing is ever lost to the decode.

use std::fmt::{Display, Formatter};

/// A meta event's text payload, decoded byte-for-byte: printable ASCII (`0x20..=0x7E`) passes
/// through unchanged, everything else becomes a `\xNN` escape. This keeps the common case (plain
/// ASCII track names and lyrics) cheap and human-readable while staying total over arbitrary
/// bytes, which MIDI files are known to contain despite the spec's "printable ASCII" guidance.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub struct Text {
    escaped: String,
    raw: Vec<u8>,
}

impl Text {
    pub(crate) fn decode(bytes: &[u8]) -> Self {
        let mut escaped = String::with_capacity(bytes.len());
        for &b in bytes {
            if (0x20..=0x7E).contains(&b) {
                escaped.push(b as char);
            } else {
                escaped.push_str(&format!("\\x{:02X}", b));
            }
        }
        Text {
            escaped,
            raw: bytes.to_vec(),
        }
    }

    /// The ASCII-with-`\xNN`-escapes rendering of the text.
    pub fn as_str(&self) -> &str {
        &self.escaped
    }

    /// The original, unescaped bytes, exactly as they appeared in the file.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

impl Display for Text {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.escaped)
    }
}

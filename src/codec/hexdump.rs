//! Canonical hex-dump text format.
//!
//! One line per 16 bytes:
//!
//! ```text
//! 00 | 48 65 6c 6c 6f 0a                                | Hello.
//! ```
//!
//! The offset column is lower-case hex, zero-padded to the width of
//! the highest line offset. The byte column is padded to 48 columns
//! so the ASCII column lines up. Parsing only looks at the middle
//! `|`-delimited field, so edits to the offset or ASCII columns are
//! ignored.

use std::fmt::Write;

use super::CodecError;

const BYTES_PER_LINE: usize = 16;
const BYTE_COLUMN_WIDTH: usize = BYTES_PER_LINE * 3;

/// Render `bytes` as hex-dump text. Empty input renders as `""`.
pub fn to_hex_dump(bytes: &[u8]) -> String {
    let last_offset = bytes.len().saturating_sub(1) / BYTES_PER_LINE * BYTES_PER_LINE;
    let width = format!("{last_offset:x}").len();

    let mut lines = Vec::with_capacity(bytes.len().div_ceil(BYTES_PER_LINE));
    for (i, chunk) in bytes.chunks(BYTES_PER_LINE).enumerate() {
        let offset = i * BYTES_PER_LINE;

        let mut hex = String::with_capacity(BYTE_COLUMN_WIDTH);
        for (j, byte) in chunk.iter().enumerate() {
            if j > 0 {
                hex.push(' ');
            }
            // Writing to a String cannot fail.
            let _ = write!(hex, "{byte:02x}");
        }

        let ascii: String = chunk.iter().map(|&b| printable(b)).collect();
        lines.push(format!(
            "{offset:0width$x} | {hex:<BYTE_COLUMN_WIDTH$}| {ascii}"
        ));
    }
    lines.join("\n")
}

/// Parse hex-dump text back into bytes.
///
/// Blank lines are skipped. Every other line must contain at least
/// one `|`, and every whitespace-separated token of the byte column
/// must be a one- or two-digit hex number.
pub fn from_hex_dump(text: &str) -> Result<Vec<u8>, CodecError> {
    let mut bytes = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let field = line.split('|').nth(1).ok_or_else(|| CodecError::HexDump {
            line: index + 1,
            reason: "missing '|' separator".into(),
        })?;

        for token in field.split_whitespace() {
            bytes.push(parse_byte(token).ok_or_else(|| CodecError::HexDump {
                line: index + 1,
                reason: format!("invalid byte {token:?}"),
            })?);
        }
    }

    Ok(bytes)
}

fn parse_byte(token: &str) -> Option<u8> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u8::from_str_radix(token, 16).ok()
}

/// ASCII column representation: printable ASCII as-is, everything
/// else as `.`.
fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

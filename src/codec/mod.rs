//! Byte/text codecs: charset detection and the hex-dump view.
//!
//! Pure functions, no state. Buffers call into these to turn raw
//! clipboard bytes into editable text and back.

pub mod charset;
pub mod hexdump;

pub use charset::{decode, encode, encoding_for_label};
pub use hexdump::{from_hex_dump, to_hex_dump};

/// Errors produced by the codecs.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown text encoding: {0:?}")]
    UnknownEncoding(String),

    /// The text contains characters the remembered encoding cannot
    /// represent.
    #[error("text is not representable in {encoding}")]
    Unmappable { encoding: &'static str },

    #[error("hex dump line {line}: {reason}")]
    HexDump { line: usize, reason: String },
}

//! Text encoding detection and conversion.
//!
//! Detection order: byte-order mark, then strict UTF-8 validity, then
//! `chardetng` frequency sniffing. The sniffed guess is always used,
//! even when the detector is unsure.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use super::CodecError;

/// Look up an encoding by its WHATWG label (`"utf-8"`, `"latin1"`,
/// `"shift_jis"`, ...).
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, CodecError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CodecError::UnknownEncoding(label.to_string()))
}

/// Guess the most likely encoding of `bytes`.
pub fn detect(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if Encoding::utf8_valid_up_to(bytes) == bytes.len() {
        return UTF_8;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

/// Decode `bytes` with `given`, or with the detected encoding when
/// `given` is `None`.
///
/// Returns the encoding actually used so the caller can re-encode
/// with it later. A byte-order mark is kept in the text (as U+FEFF)
/// so that re-encoding reproduces it. Malformed sequences decode to
/// U+FFFD rather than failing.
pub fn decode(bytes: &[u8], given: Option<&'static Encoding>) -> (&'static Encoding, String) {
    let encoding = given.unwrap_or_else(|| detect(bytes));
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::warn!(
            encoding = encoding.name(),
            len = bytes.len(),
            "malformed input replaced while decoding"
        );
    }
    (encoding, text.into_owned())
}

/// Encode `text` with `encoding`.
///
/// `encoding_rs` only encodes UTF-16 input as UTF-8, so the two
/// UTF-16 variants are serialized by hand.
pub fn encode(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>, CodecError> {
    if encoding == UTF_16LE {
        return Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect());
    }
    if encoding == UTF_16BE {
        return Ok(text.encode_utf16().flat_map(u16::to_be_bytes).collect());
    }

    let (bytes, used, had_errors) = encoding.encode(text);
    if had_errors || used != encoding {
        return Err(CodecError::Unmappable {
            encoding: encoding.name(),
        });
    }
    Ok(bytes.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, WINDOWS_1252};

    // -- Detection --

    #[test]
    fn ascii_detects_as_utf8() {
        assert_eq!(detect(b"Hello\n"), UTF_8);
    }

    #[test]
    fn empty_detects_as_utf8() {
        assert_eq!(detect(b""), UTF_8);
    }

    #[test]
    fn bom_wins_over_content() {
        assert_eq!(detect(b"\xff\xfeH\x00i\x00"), UTF_16LE);
        assert_eq!(detect(b"\xfe\xff\x00H\x00i"), UTF_16BE);
        assert_eq!(detect(b"\xef\xbb\xbfHi"), UTF_8);
    }

    #[test]
    fn non_utf8_is_sniffed() {
        // "café" in windows-1252: a lone 0xE9 is not valid UTF-8.
        let encoding = detect(b"caf\xe9 au lait, s'il vous pla\xeet");
        assert_ne!(encoding, UTF_8);
    }

    // -- Labels --

    #[test]
    fn labels_resolve() {
        assert_eq!(encoding_for_label("utf-8").unwrap(), UTF_8);
        assert_eq!(encoding_for_label(" latin1 ").unwrap(), WINDOWS_1252);
        assert_eq!(encoding_for_label("sjis").unwrap(), SHIFT_JIS);
    }

    #[test]
    fn unknown_label_rejected() {
        let err = encoding_for_label("klingon").unwrap_err();
        assert!(matches!(err, CodecError::UnknownEncoding(_)));
    }

    // -- Decode / encode --

    #[test]
    fn given_encoding_overrides_detection() {
        let (encoding, text) = decode(b"caf\xe9", Some(WINDOWS_1252));
        assert_eq!(encoding, WINDOWS_1252);
        assert_eq!(text, "café");
    }

    #[test]
    fn shift_jis_preserved_through_reencode() {
        let original = b"\x83\x65\x83\x58\x83\x67";
        let (_, text) = decode(original, Some(SHIFT_JIS));
        assert_eq!(text, "テスト");
        assert_eq!(encode(&text, SHIFT_JIS).unwrap(), original);
    }

    #[test]
    fn utf16_with_bom_reencodes_identically() {
        let original = b"\xff\xfeH\x00i\x00\n\x00";
        let (encoding, text) = decode(original, None);
        assert_eq!(text, "\u{feff}Hi\n");
        assert_eq!(encode(&text, encoding).unwrap(), original);
    }

    #[test]
    fn unmappable_text_is_an_error() {
        let err = encode("漢字", WINDOWS_1252).unwrap_err();
        assert!(matches!(err, CodecError::Unmappable { .. }));
    }
}

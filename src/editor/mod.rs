//! Format/editor resolution.
//!
//! Given the formats currently on the clipboard, [`resolve`] lists every
//! (format, transform) pairing the user can open, and [`select`] decides
//! which one is active. Every offered format gets at least one
//! candidate: formats nobody knows how to edit fall back to a hex dump.

pub mod buffer;

pub use buffer::{Buffer, BufferError, BufferEvent, BufferKind};

/// Separator between a format and its transform label in a display key.
pub const TRANSFORM_SEPARATOR: &str = " |> ";

/// Transform label of the native (untransformed) editor.
pub const NATIVE: &str = "";

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const TEXT_RTF: &str = "text/rtf";

/// Formats tried, in order, when the previous selection is gone.
const DEFAULT_PRIORITY: &[&str] = &[TEXT_PLAIN, TEXT_HTML, TEXT_RTF];

/// Known formats and their editors, native entry first.
const REGISTRY: &[(&str, &[(&str, BufferKind)])] = &[
    (
        TEXT_PLAIN,
        &[(NATIVE, BufferKind::PlainText), ("HexDump", BufferKind::Hex)],
    ),
    (
        "text/plain;charset=utf-8",
        &[(NATIVE, BufferKind::PlainText), ("HexDump", BufferKind::Hex)],
    ),
    (
        "UTF8_STRING",
        &[(NATIVE, BufferKind::PlainText), ("HexDump", BufferKind::Hex)],
    ),
    (
        TEXT_HTML,
        &[
            (NATIVE, BufferKind::Html),
            ("PlainText", BufferKind::PlainText),
            ("HexDump", BufferKind::Hex),
        ],
    ),
];

/// Fallback editor for formats missing from the registry.
const FALLBACK: (&str, BufferKind) = ("HexDump", BufferKind::Hex);

/// One selectable (format, transform) pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorCandidate {
    pub format: String,
    /// Empty for the native editor.
    pub transform: &'static str,
    pub kind: BufferKind,
}

impl EditorCandidate {
    /// Key shown to the user: `format` or `format |> transform`.
    pub fn display_key(&self) -> String {
        if self.transform.is_empty() {
            self.format.clone()
        } else {
            format!("{}{TRANSFORM_SEPARATOR}{}", self.format, self.transform)
        }
    }
}

/// List the candidates for `formats`, preserving their order.
pub fn resolve<S: AsRef<str>>(formats: &[S]) -> Vec<EditorCandidate> {
    let mut candidates = Vec::new();

    for format in formats {
        let format = format.as_ref();
        let row = REGISTRY
            .iter()
            .find(|(known, _)| *known == format)
            .map(|(_, editors)| *editors);

        match row {
            Some(editors) => {
                candidates.extend(editors.iter().map(|&(transform, kind)| EditorCandidate {
                    format: format.to_string(),
                    transform,
                    kind,
                }));
            }
            None => candidates.push(EditorCandidate {
                format: format.to_string(),
                transform: FALLBACK.0,
                kind: FALLBACK.1,
            }),
        }
    }

    candidates
}

/// Index of the default candidate, or `None` if there are none.
///
/// Prefers plain text, then HTML, then RTF, each with its first
/// (native, when registered) editor; otherwise the first candidate.
pub fn default_selection(candidates: &[EditorCandidate]) -> Option<usize> {
    DEFAULT_PRIORITY
        .iter()
        .find_map(|preferred| candidates.iter().position(|c| c.format == *preferred))
        .or_else(|| (!candidates.is_empty()).then_some(0))
}

/// Keep `previous` if it is still offered, else fall back to the
/// default.
pub fn select(candidates: &[EditorCandidate], previous: Option<&str>) -> Option<usize> {
    previous
        .and_then(|key| candidates.iter().position(|c| c.display_key() == key))
        .or_else(|| default_selection(candidates))
}

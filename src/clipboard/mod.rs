//! Clipboard access: the system clipboard behind a small trait.
//!
//! The workbench only needs to list formats, read one format, replace
//! the whole content, learn whether the current content is its own
//! last write, and be told when the content changes. Platform adapters
//! implement [`ClipboardProvider`]; the sync coordinator is generic
//! over it.

#[cfg(test)]
pub mod memory;
pub mod xclip;

#[cfg(test)]
pub use memory::MemoryClipboard;
pub use xclip::{Selection, XclipProvider};

/// Selection targets that describe the selection itself rather than
/// carry data. Never shown as formats.
const META_TARGETS: &[&str] = &[
    "TARGETS",
    "TIMESTAMP",
    "MULTIPLE",
    "SAVE_TARGETS",
    "DELETE",
    "INCR",
];

/// Errors returned by clipboard adapters.
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("failed to spawn {tool}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    #[error("{tool} exited with status {status}")]
    Exit {
        tool: &'static str,
        status: std::process::ExitStatus,
    },

    #[error("clipboard pipe")]
    Io(#[from] std::io::Error),

    /// The adapter refused the content (e.g. nothing to write).
    #[error("clipboard rejected content: {0}")]
    Rejected(String),
}

/// Whether `format` carries data worth offering to the user.
pub fn is_interesting(format: &str) -> bool {
    !format.is_empty() && !META_TARGETS.contains(&format)
}

/// Clipboard content at one instant: format → bytes, in the order the
/// clipboard listed the formats. Format keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardSnapshot {
    entries: Vec<(String, Vec<u8>)>,
}

impl ClipboardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot holding a single format.
    pub fn single(format: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert(format, bytes);
        snapshot
    }

    /// Insert or replace `format`, keeping its original position.
    pub fn insert(&mut self, format: impl Into<String>, bytes: Vec<u8>) {
        let format = format.into();
        match self.entries.iter_mut().find(|(f, _)| *f == format) {
            Some((_, existing)) => *existing = bytes,
            None => self.entries.push((format, bytes)),
        }
    }

    pub fn get(&self, format: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(f, _)| f == format)
            .map(|(_, bytes)| bytes.as_slice())
    }

    /// Format keys in clipboard order.
    pub fn formats(&self) -> Vec<&str> {
        self.entries.iter().map(|(f, _)| f.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(f, bytes)| (f.as_str(), bytes.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: Into<String>> FromIterator<(F, Vec<u8>)> for ClipboardSnapshot {
    fn from_iter<I: IntoIterator<Item = (F, Vec<u8>)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (format, bytes) in iter {
            snapshot.insert(format, bytes);
        }
        snapshot
    }
}

/// Reads and writes the system clipboard.
pub trait ClipboardProvider {
    /// Formats currently offered, in the clipboard's own order.
    fn formats(&self) -> Result<Vec<String>, ClipboardError>;

    /// Bytes of one format.
    fn read(&self, format: &str) -> Result<Vec<u8>, ClipboardError>;

    /// Replace the whole clipboard content.
    fn write(&mut self, content: &ClipboardSnapshot) -> Result<(), ClipboardError>;

    /// Whether the current content is this process's last write.
    fn owns_current_content(&self) -> bool;

    /// Change notification: `true` if the content changed since the
    /// previous call. The host loop polls this.
    fn poll_change(&mut self) -> Result<bool, ClipboardError>;

    /// Read every interesting format once.
    fn snapshot(&self) -> Result<ClipboardSnapshot, ClipboardError> {
        let mut snapshot = ClipboardSnapshot::new();
        for format in self.formats()? {
            if is_interesting(&format) {
                let bytes = self.read(&format)?;
                snapshot.insert(format, bytes);
            }
        }
        Ok(snapshot)
    }
}

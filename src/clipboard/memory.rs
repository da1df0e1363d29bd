//! In-process clipboard used by tests.
//!
//! Records every write so tests can assert how many times the
//! workbench pushed content out, and lets a test play the role of
//! another application replacing the clipboard.

use super::{ClipboardError, ClipboardProvider, ClipboardSnapshot};

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    content: ClipboardSnapshot,
    owned: bool,
    changed: bool,
    reject_writes: bool,
    writes: Vec<ClipboardSnapshot>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Another application replaces the clipboard.
    pub fn set_external(&mut self, content: ClipboardSnapshot) {
        self.content = content;
        self.owned = false;
        self.changed = true;
    }

    /// Make subsequent writes fail.
    pub fn reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }

    /// Every snapshot written by the workbench, oldest first.
    pub fn writes(&self) -> &[ClipboardSnapshot] {
        &self.writes
    }

    pub fn content(&self) -> &ClipboardSnapshot {
        &self.content
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn formats(&self) -> Result<Vec<String>, ClipboardError> {
        Ok(self.content.formats().into_iter().map(String::from).collect())
    }

    fn read(&self, format: &str) -> Result<Vec<u8>, ClipboardError> {
        self.content
            .get(format)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ClipboardError::Rejected(format!("format not offered: {format}")))
    }

    fn write(&mut self, content: &ClipboardSnapshot) -> Result<(), ClipboardError> {
        if self.reject_writes {
            return Err(ClipboardError::Rejected("writes disabled".into()));
        }
        self.content = content.clone();
        self.owned = true;
        // Real clipboards notify about our own writes too.
        self.changed = true;
        self.writes.push(content.clone());
        Ok(())
    }

    fn owns_current_content(&self) -> bool {
        self.owned
    }

    fn poll_change(&mut self) -> Result<bool, ClipboardError> {
        Ok(std::mem::take(&mut self.changed))
    }
}

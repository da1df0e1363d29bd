//! Sync coordinator: keeps the clipboard and the buffer consistent.
//!
//! Three notifications drive the state machine:
//!
//! - the clipboard changed ([`SyncCoordinator::on_clipboard_changed`]),
//! - the buffer was edited ([`SyncCoordinator::on_buffer_edited`]),
//! - the user picked another editor ([`SyncCoordinator::select_editor`]).
//!
//! Each handler claims the [`DirectionLock`] for its direction and drops
//! the notification if a synchronization is already running. Loading
//! the buffer never emits an edit event, and the clipboard change caused
//! by our own write is recognised through `owns_current_content`, so
//! neither side can echo the other.
//!
//! A failed synchronization leaves the snapshot, the selection and the
//! clipboard as they were.

pub mod direction;

use encoding_rs::Encoding;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::clipboard::{ClipboardError, ClipboardProvider, ClipboardSnapshot};
use crate::command::{CommandContext, CommandError, Cursor, Dispatcher};
use crate::editor::{self, Buffer, BufferError, BufferEvent, EditorCandidate};

pub use direction::{DirectionLock, SyncDirection};

/// Errors returned by synchronization and command execution.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("no editor selected")]
    NoSelection,

    #[error("no such editor: {0}")]
    NoSuchEditor(String),
}

/// How a notification was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// State was synchronized.
    Synced,
    /// Another synchronization held the lock; notification dropped.
    Busy,
    /// The clipboard change was our own write; nothing to reload.
    OwnWrite,
    /// The edit came from a buffer that has since been replaced.
    Stale,
}

/// The shared (snapshot, selection, buffer) triple and the clipboard
/// it mirrors.
struct Workbench<C> {
    clipboard: C,
    snapshot: ClipboardSnapshot,
    candidates: Vec<EditorCandidate>,
    selected: Option<usize>,
    buffer: Option<Buffer>,
    /// Generation of the installed buffer. Edit events carrying any
    /// other value are stale.
    generation: u64,
    events_tx: UnboundedSender<BufferEvent>,
    events_rx: UnboundedReceiver<BufferEvent>,
    encoding: Option<&'static Encoding>,
}

impl<C: ClipboardProvider> Workbench<C> {
    fn current(&self) -> Option<&EditorCandidate> {
        self.selected.and_then(|index| self.candidates.get(index))
    }

    /// Build an unsubscribed buffer for `candidate` from `snapshot`.
    fn materialize(&self, candidate: &EditorCandidate, snapshot: &ClipboardSnapshot) -> Buffer {
        let mut buffer = candidate.kind.create(self.encoding);
        buffer.set_content(snapshot.get(&candidate.format).unwrap_or_default());
        buffer
    }

    /// Replace the buffer. The old one is unsubscribed and dropped.
    fn install(&mut self, buffer: Option<Buffer>) {
        if let Some(mut old) = self.buffer.take() {
            old.unsubscribe();
        }
        self.generation += 1;
        self.buffer = buffer.map(|mut buffer| {
            buffer.subscribe(self.generation, self.events_tx.clone());
            buffer
        });
    }

    /// Adopt a fresh snapshot: re-resolve, keep or reset the selection,
    /// rebuild the buffer.
    fn load(&mut self, snapshot: ClipboardSnapshot) {
        let candidates = editor::resolve(&snapshot.formats());
        let previous = self.current().map(EditorCandidate::display_key);
        let selected = editor::select(&candidates, previous.as_deref());
        let buffer = selected.map(|index| self.materialize(&candidates[index], &snapshot));

        if snapshot.is_empty() {
            tracing::debug!("clipboard is empty");
        }
        tracing::debug!(
            formats = snapshot.len(),
            candidates = candidates.len(),
            editor = ?selected.map(|index| candidates[index].display_key()),
            "loaded clipboard snapshot"
        );

        self.snapshot = snapshot;
        self.candidates = candidates;
        self.selected = selected;
        self.install(buffer);
    }

    /// Encode the buffer and make it the whole clipboard content.
    fn write_back(&mut self) -> Result<(), SyncError> {
        let candidate = self.current().ok_or(SyncError::NoSelection)?;
        let key = candidate.display_key();
        let format = candidate.format.clone();
        let buffer = self.buffer.as_ref().ok_or(SyncError::NoSelection)?;
        let bytes = buffer.get_content()?;
        let size = bytes.len();
        let snapshot = ClipboardSnapshot::single(format.clone(), bytes);

        self.clipboard.write(&snapshot)?;
        tracing::info!(format = %format, bytes = size, "buffer written to clipboard");

        // The clipboard now offers only the written format. The buffer
        // already shows it, so keep the buffer and only narrow the rest.
        self.candidates = editor::resolve(&snapshot.formats());
        self.selected = editor::select(&self.candidates, Some(&key));
        self.snapshot = snapshot;
        Ok(())
    }
}

/// Mediates between the clipboard, the buffer and the user.
pub struct SyncCoordinator<C> {
    lock: DirectionLock,
    state: Workbench<C>,
    commands: Dispatcher,
}

impl<C: ClipboardProvider> SyncCoordinator<C> {
    /// Coordinator over `clipboard` with the default command set.
    ///
    /// `encoding` forces the text encoding of text buffers; `None`
    /// sniffs it from each snapshot.
    pub fn new(clipboard: C, encoding: Option<&'static Encoding>) -> Self {
        Self::with_commands(clipboard, encoding, Dispatcher::default())
    }

    pub fn with_commands(
        clipboard: C,
        encoding: Option<&'static Encoding>,
        commands: Dispatcher,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            lock: DirectionLock::default(),
            state: Workbench {
                clipboard,
                snapshot: ClipboardSnapshot::new(),
                candidates: Vec::new(),
                selected: None,
                buffer: None,
                generation: 0,
                events_tx,
                events_rx,
                encoding,
            },
            commands,
        }
    }

    // -- Notifications --

    /// Ask the clipboard whether it changed and react if it did.
    pub fn poll_clipboard(&mut self) -> Result<Option<SyncOutcome>, SyncError> {
        if self.state.clipboard.poll_change()? {
            self.on_clipboard_changed().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Clipboard → buffer: snapshot the clipboard and rebuild the view.
    pub fn on_clipboard_changed(&mut self) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.lock.try_acquire(SyncDirection::ClipboardToBuffer) else {
            tracing::debug!(direction = ?self.lock.current(), "clipboard change dropped: busy");
            return Ok(SyncOutcome::Busy);
        };

        if self.state.clipboard.owns_current_content() {
            tracing::debug!("clipboard change is our own write");
            return Ok(SyncOutcome::OwnWrite);
        }

        let snapshot = self.state.clipboard.snapshot()?;
        self.state.load(snapshot);
        Ok(SyncOutcome::Synced)
    }

    /// Buffer → clipboard: write the edited buffer out.
    pub fn on_buffer_edited(&mut self, generation: u64) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.lock.try_acquire(SyncDirection::BufferToClipboard) else {
            tracing::debug!(direction = ?self.lock.current(), "buffer edit dropped: busy");
            return Ok(SyncOutcome::Busy);
        };

        if generation != self.state.generation {
            tracing::debug!(
                generation,
                current = self.state.generation,
                "edit from a replaced buffer"
            );
            return Ok(SyncOutcome::Stale);
        }

        self.state.write_back()?;
        Ok(SyncOutcome::Synced)
    }

    /// Switch to the candidate at `index` and rebuild the buffer from
    /// the current snapshot. The clipboard is left alone.
    pub fn select_editor(&mut self, index: usize) -> Result<SyncOutcome, SyncError> {
        let Some(_guard) = self.lock.try_acquire(SyncDirection::ClipboardToBuffer) else {
            tracing::debug!(direction = ?self.lock.current(), "selection change dropped: busy");
            return Ok(SyncOutcome::Busy);
        };

        let candidate = self
            .state
            .candidates
            .get(index)
            .ok_or_else(|| SyncError::NoSuchEditor(index.to_string()))?;
        let buffer = self.state.materialize(candidate, &self.state.snapshot);
        tracing::debug!(editor = %candidate.display_key(), "editor selected");

        self.state.selected = Some(index);
        self.state.install(Some(buffer));
        Ok(SyncOutcome::Synced)
    }

    /// [`select_editor`](Self::select_editor) by display key.
    pub fn select_by_key(&mut self, key: &str) -> Result<SyncOutcome, SyncError> {
        let index = self
            .state
            .candidates
            .iter()
            .position(|c| c.display_key() == key)
            .ok_or_else(|| SyncError::NoSuchEditor(key.to_string()))?;
        self.select_editor(index)
    }

    /// Handle every queued buffer edit. Returns the last outcome, if
    /// any edit was queued.
    pub fn pump(&mut self) -> Result<Option<SyncOutcome>, SyncError> {
        let mut last = None;
        while let Ok(BufferEvent::Changed { generation }) = self.state.events_rx.try_recv() {
            last = Some(self.on_buffer_edited(generation)?);
        }
        Ok(last)
    }

    // -- User actions --

    /// Replace the buffer text as the user would, then sync it out.
    pub fn edit_buffer(&mut self, text: impl Into<String>) -> Result<SyncOutcome, SyncError> {
        let buffer = self.state.buffer.as_mut().ok_or(SyncError::NoSelection)?;
        buffer.edit(text);
        Ok(self.pump()?.unwrap_or(SyncOutcome::Synced))
    }

    /// Run a command line against the buffer and sync the result out.
    ///
    /// On any failure the buffer keeps its previous text and the
    /// clipboard is not written.
    pub fn run_command(&mut self, tokens: &[String]) -> Result<SyncOutcome, SyncError> {
        let context = CommandContext {
            current_format: self.current_format(),
            text: self.state.buffer.as_ref().map_or("", Buffer::text),
        };
        let output = self.commands.run(tokens, &context)?;

        let buffer = self.state.buffer.as_mut().ok_or(SyncError::NoSelection)?;
        let previous = buffer.text().to_string();
        buffer.edit(output);

        match self.pump() {
            Ok(outcome) => Ok(outcome.unwrap_or(SyncOutcome::Synced)),
            Err(e) => {
                if let Some(buffer) = self.state.buffer.as_mut() {
                    buffer.restore(previous);
                }
                Err(e)
            }
        }
    }

    /// Completions for a partially typed command line.
    pub fn complete(&self, tokens: &[String], cursor: Cursor) -> Vec<String> {
        self.commands.complete(tokens, cursor)
    }

    // -- Accessors --

    #[cfg(test)]
    pub fn direction(&self) -> SyncDirection {
        self.lock.current()
    }

    pub fn candidates(&self) -> &[EditorCandidate] {
        &self.state.candidates
    }

    /// Index of the selected candidate.
    pub fn selected(&self) -> Option<usize> {
        self.state.selected
    }

    /// Display key of the selected candidate.
    pub fn current_editor(&self) -> Option<String> {
        self.state.current().map(EditorCandidate::display_key)
    }

    pub fn current_format(&self) -> Option<&str> {
        self.state.current().map(|c| c.format.as_str())
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.state.buffer.as_ref()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> &ClipboardSnapshot {
        &self.state.snapshot
    }

    #[cfg(test)]
    pub fn clipboard(&self) -> &C {
        &self.state.clipboard
    }

    #[cfg(test)]
    pub fn clipboard_mut(&mut self) -> &mut C {
        &mut self.state.clipboard
    }
}

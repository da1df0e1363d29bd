//! Editable buffers: the live view of one clipboard format.
//!
//! A [`Buffer`] converts raw clipboard bytes into editable text
//! ([`Buffer::set_content`]) and back ([`Buffer::get_content`]).
//! User edits go through [`Buffer::edit`], which is the only path that
//! emits a [`BufferEvent`]. Programmatic `set_content` never notifies;
//! the sync coordinator relies on that to tell its own writes apart
//! from user edits.
//!
//! Notification is an owned channel sender: the coordinator hands the
//! buffer a sender tagged with a generation number, and dropping the
//! buffer (or calling [`Buffer::unsubscribe`]) releases it.

use encoding_rs::Encoding;
use tokio::sync::mpsc::UnboundedSender;

use crate::codec::{self, CodecError};

/// Errors returned by buffer conversions.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// `get_content` was called before any `set_content` established
    /// which encoding to write back with.
    #[error("no text encoding known yet: buffer was never loaded")]
    NoEncoding,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Notification emitted when the user edits a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferEvent {
    /// Content of the buffer with this generation was edited.
    Changed { generation: u64 },
}

/// Which buffer variant a candidate builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    PlainText,
    Html,
    Hex,
}

impl BufferKind {
    /// Build an empty buffer of this kind.
    ///
    /// `encoding` forces the text encoding for the text variants
    /// instead of sniffing it from the content. Ignored for hex.
    pub fn create(self, encoding: Option<&'static Encoding>) -> Buffer {
        let view = match self {
            BufferKind::PlainText => BufferView::PlainText(TextView::new(encoding)),
            BufferKind::Html => BufferView::Html(TextView::new(encoding)),
            BufferKind::Hex => BufferView::Hex(HexView::default()),
        };
        Buffer {
            view,
            notifier: None,
        }
    }
}

/// Text state shared by the plain-text and HTML variants.
///
/// Remembers the encoding discovered at decode time so that writing
/// back uses the same one.
#[derive(Debug)]
pub struct TextView {
    text: String,
    forced: Option<&'static Encoding>,
    encoding: Option<&'static Encoding>,
}

impl TextView {
    fn new(forced: Option<&'static Encoding>) -> Self {
        Self {
            text: String::new(),
            forced,
            encoding: None,
        }
    }

    fn load(&mut self, bytes: &[u8]) {
        let (encoding, text) = codec::decode(bytes, self.forced);
        self.encoding = Some(encoding);
        self.text = text;
    }

    fn store(&self) -> Result<Vec<u8>, BufferError> {
        let encoding = self.encoding.ok_or(BufferError::NoEncoding)?;
        Ok(codec::encode(&self.text, encoding)?)
    }

    /// Encoding discovered by the last load, if any.
    pub fn encoding(&self) -> Option<&'static Encoding> {
        self.encoding
    }
}

/// Hex-dump view of raw bytes. No encoding state.
#[derive(Debug, Default)]
pub struct HexView {
    text: String,
}

/// The closed set of buffer variants.
#[derive(Debug)]
pub enum BufferView {
    /// Decoded text, edited as-is.
    PlainText(TextView),
    /// Decoded HTML markup.
    Html(TextView),
    /// Canonical hex dump of the raw bytes.
    Hex(HexView),
}

#[derive(Debug)]
struct ChangeNotifier {
    generation: u64,
    tx: UnboundedSender<BufferEvent>,
}

/// A live editable buffer plus its change subscription.
#[derive(Debug)]
pub struct Buffer {
    view: BufferView,
    notifier: Option<ChangeNotifier>,
}

impl Buffer {
    pub fn kind(&self) -> BufferKind {
        match self.view {
            BufferView::PlainText(_) => BufferKind::PlainText,
            BufferView::Html(_) => BufferKind::Html,
            BufferView::Hex(_) => BufferKind::Hex,
        }
    }

    pub fn view(&self) -> &BufferView {
        &self.view
    }

    /// Current editable text.
    pub fn text(&self) -> &str {
        match &self.view {
            BufferView::PlainText(v) | BufferView::Html(v) => &v.text,
            BufferView::Hex(v) => &v.text,
        }
    }

    /// Load raw bytes into the buffer. Never notifies subscribers.
    pub fn set_content(&mut self, bytes: &[u8]) {
        match &mut self.view {
            BufferView::PlainText(v) | BufferView::Html(v) => v.load(bytes),
            BufferView::Hex(v) => v.text = codec::to_hex_dump(bytes),
        }
    }

    /// Convert the current text back into raw bytes.
    pub fn get_content(&self) -> Result<Vec<u8>, BufferError> {
        match &self.view {
            BufferView::PlainText(v) | BufferView::Html(v) => v.store(),
            BufferView::Hex(v) => Ok(codec::from_hex_dump(&v.text)?),
        }
    }

    /// Put back earlier text without notifying, e.g. after a failed
    /// write-out.
    pub fn restore(&mut self, text: impl Into<String>) {
        let text = text.into();
        match &mut self.view {
            BufferView::PlainText(v) | BufferView::Html(v) => v.text = text,
            BufferView::Hex(v) => v.text = text,
        }
    }

    /// Replace the text as a user edit and notify the subscriber.
    pub fn edit(&mut self, text: impl Into<String>) {
        self.restore(text);

        if let Some(notifier) = &self.notifier {
            let event = BufferEvent::Changed {
                generation: notifier.generation,
            };
            // A closed receiver means nobody is listening anymore.
            if notifier.tx.send(event).is_err() {
                tracing::debug!(generation = notifier.generation, "buffer edit unobserved");
            }
        }
    }

    /// Route edit notifications to `tx`, tagged with `generation`.
    pub fn subscribe(&mut self, generation: u64, tx: UnboundedSender<BufferEvent>) {
        self.notifier = Some(ChangeNotifier { generation, tx });
    }

    /// Release the edit subscription.
    pub fn unsubscribe(&mut self) {
        self.notifier = None;
    }
}

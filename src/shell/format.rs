//! Output formatting for the shell and the one-shot subcommands.
//!
//! Everything writes to a caller-supplied writer so the shell can be
//! driven against an in-memory buffer.

use std::error::Error;
use std::io::{self, Write};

use crate::editor::buffer::BufferView;
use crate::editor::{Buffer, EditorCandidate};

/// Print candidates as a table, marking the selected row with `*`.
pub fn print_candidates(
    out: &mut impl Write,
    candidates: &[EditorCandidate],
    selected: Option<usize>,
) -> io::Result<()> {
    if candidates.is_empty() {
        writeln!(out, "Clipboard is empty")?;
        return Ok(());
    }

    writeln!(out, "{:>3}   {:<48} VIEW", "#", "EDITOR")?;
    writeln!(out, "{}", "-".repeat(64))?;
    for (index, candidate) in candidates.iter().enumerate() {
        let marker = if selected == Some(index) { '*' } else { ' ' };
        writeln!(
            out,
            "{index:>3} {marker} {:<48} {:?}",
            candidate.display_key(),
            candidate.kind
        )?;
    }
    Ok(())
}

/// Print buffer text, terminated by a newline.
pub fn print_text(out: &mut impl Write, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    if !text.is_empty() && !text.ends_with('\n') {
        writeln!(out)?;
    }
    Ok(())
}

/// Editor, view and encoding of a buffer. The one-shot `show` sends
/// this to stderr so stdout carries only the text.
pub fn print_buffer_info(out: &mut impl Write, editor: &str, buffer: &Buffer) -> io::Result<()> {
    writeln!(out, "Editor:   {editor}")?;
    writeln!(out, "View:     {:?}", buffer.kind())?;
    if let BufferView::PlainText(view) | BufferView::Html(view) = buffer.view() {
        if let Some(encoding) = view.encoding() {
            writeln!(out, "Encoding: {}", encoding.name())?;
        }
    }
    writeln!(out, "---")
}

pub fn print_completions(out: &mut impl Write, completions: &[String]) -> io::Result<()> {
    if completions.is_empty() {
        writeln!(out, "No completions")?;
    }
    for completion in completions {
        writeln!(out, "{completion}")?;
    }
    Ok(())
}

/// Confirmation after the buffer was written to the clipboard.
pub fn print_written(out: &mut impl Write, editor: Option<&str>) -> io::Result<()> {
    writeln!(out, "Clipboard updated ({})", editor.unwrap_or("no editor"))
}

/// Notice that another application replaced the clipboard.
pub fn print_reloaded(out: &mut impl Write, editor: Option<&str>) -> io::Result<()> {
    match editor {
        Some(editor) => writeln!(out, "Clipboard changed, editing {editor}"),
        None => writeln!(out, "Clipboard changed, now empty"),
    }
}

/// `error: <message>` followed by the source chain.
pub fn print_error(out: &mut impl Write, error: &dyn Error) -> io::Result<()> {
    writeln!(out, "error: {error}")?;
    let mut source = error.source();
    while let Some(cause) = source {
        writeln!(out, "  caused by: {cause}")?;
        source = cause.source();
    }
    Ok(())
}

pub fn print_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Shell commands:")?;
    writeln!(out, "  :formats, :ls          list editors for the clipboard")?;
    writeln!(out, "  :select <index|key>    switch editor")?;
    writeln!(out, "  :show                  print the buffer")?;
    writeln!(out, "  :edit                  edit the buffer in $VISUAL / $EDITOR")?;
    writeln!(out, "  :complete <partial>    complete a command line")?;
    writeln!(out, "  :quit                  exit (also end of input)")?;
    writeln!(out, "Anything else runs as a text command, e.g. add_prefix \"> \"")
}

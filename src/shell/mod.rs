//! Interactive workbench shell.
//!
//! Terminal stand-in for the editor window. One event loop multiplexes
//! input lines with a clipboard polling interval. Lines starting with
//! `:` are shell commands (`:formats`, `:select`, `:show`, `:edit`,
//! `:complete`, `:quit`); anything else is tokenized shell-style and
//! run through the command dispatcher.
//!
//! The one-shot subcommands (`formats`, `show`, `run`) reuse the same
//! loading and selection path without the loop.

pub mod format;

use std::io::{self, Write};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::cli::WorkbenchConfig;
use crate::clipboard::{ClipboardProvider, XclipProvider};
use crate::command::Cursor;
use crate::editor::Buffer;
use crate::sync::{SyncCoordinator, SyncError, SyncOutcome};

const PROMPT: &str = "clipbench> ";

const DEFAULT_EDITOR: &str = "vi";

/// Shell error type.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("unbalanced quotes: {0}")]
    Tokenize(String),

    #[error("unknown shell command `:{0}` (try :help)")]
    UnknownMeta(String),

    #[error(":{command} expects {expected}")]
    MetaUsage {
        command: &'static str,
        expected: &'static str,
    },

    #[error("editor command is empty")]
    NoEditor,

    #[error("editor `{program}` exited with status {status}")]
    Editor {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Blank,
    Meta(Meta),
    /// Tokens for the command dispatcher.
    Command(Vec<String>),
}

/// Shell commands.
#[derive(Debug, PartialEq, Eq)]
pub enum Meta {
    Formats,
    Select(String),
    Show,
    Edit,
    /// Partial command line, cursor at its end.
    Complete(String),
    Help,
    Quit,
}

enum Flow {
    Continue,
    Quit,
}

pub fn parse_input(line: &str) -> Result<Input, ShellError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Input::Blank);
    }
    if let Some(rest) = line.trim_start().strip_prefix(':') {
        return parse_meta(rest).map(Input::Meta);
    }
    shlex::split(trimmed)
        .map(Input::Command)
        .ok_or_else(|| ShellError::Tokenize(trimmed.to_string()))
}

fn parse_meta(rest: &str) -> Result<Meta, ShellError> {
    let (name, argument) = match rest.split_once(' ') {
        Some((name, argument)) => (name, argument),
        None => (rest.trim_end(), ""),
    };

    match name {
        "formats" | "ls" => Ok(Meta::Formats),
        "select" => {
            let target = argument.trim();
            if target.is_empty() {
                return Err(ShellError::MetaUsage {
                    command: "select",
                    expected: "an index or an editor key",
                });
            }
            Ok(Meta::Select(target.to_string()))
        }
        "show" => Ok(Meta::Show),
        "edit" => Ok(Meta::Edit),
        // Trailing whitespace is significant: it starts a new token.
        "complete" => Ok(Meta::Complete(argument.to_string())),
        "help" | "h" => Ok(Meta::Help),
        "quit" | "q" => Ok(Meta::Quit),
        other => Err(ShellError::UnknownMeta(other.to_string())),
    }
}

/// Tokens and cursor for completing at the end of `partial`.
pub fn completion_point(partial: &str) -> (Vec<String>, Cursor) {
    let mut tokens = shlex::split(partial)
        .unwrap_or_else(|| partial.split_whitespace().map(String::from).collect());
    if partial.is_empty() || partial.ends_with(char::is_whitespace) {
        tokens.push(String::new());
    }
    let token = tokens.len().saturating_sub(1);
    let offset = tokens.last().map_or(0, String::len);
    (tokens, Cursor { token, offset })
}

/// Switch to the editor named by `target`: an index into the candidate
/// list or a display key.
pub fn select<C: ClipboardProvider>(
    coordinator: &mut SyncCoordinator<C>,
    target: &str,
) -> Result<SyncOutcome, SyncError> {
    match target.parse::<usize>() {
        Ok(index) => coordinator.select_editor(index),
        Err(_) => coordinator.select_by_key(target),
    }
}

/// Load the clipboard once and optionally switch editor.
pub fn open<C: ClipboardProvider>(
    clipboard: C,
    config: &WorkbenchConfig,
    editor: Option<&str>,
) -> Result<SyncCoordinator<C>, ShellError> {
    let mut coordinator = SyncCoordinator::new(clipboard, config.encoding);
    coordinator.on_clipboard_changed()?;
    if let Some(target) = editor {
        select(&mut coordinator, target)?;
    }
    Ok(coordinator)
}

/// The interactive loop over a coordinator and an output stream.
pub struct Shell<C, W> {
    coordinator: SyncCoordinator<C>,
    out: W,
}

impl<C: ClipboardProvider, W: Write> Shell<C, W> {
    pub fn new(coordinator: SyncCoordinator<C>, out: W) -> Self {
        Self { coordinator, out }
    }

    #[cfg(test)]
    pub fn coordinator(&self) -> &SyncCoordinator<C> {
        &self.coordinator
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until `:quit` or end of input.
    pub async fn run<R>(&mut self, input: R, poll_interval: Duration) -> Result<(), ShellError>
    where
        R: AsyncBufRead + Unpin,
    {
        self.coordinator.poll_clipboard()?;
        format::print_candidates(
            &mut self.out,
            self.coordinator.candidates(),
            self.coordinator.selected(),
        )?;
        self.prompt()?;

        let mut lines = input.lines();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                // -- Input line --
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        tracing::debug!("end of input");
                        break;
                    };
                    match self.handle_line(&line).await {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => break,
                        Err(e) => {
                            tracing::debug!(error = %e, "line failed");
                            format::print_error(&mut self.out, &e)?;
                        }
                    }
                    self.prompt()?;
                }

                // -- Clipboard poll --
                _ = ticker.tick() => {
                    match self.coordinator.poll_clipboard() {
                        Ok(Some(SyncOutcome::Synced)) => {
                            writeln!(self.out)?;
                            let editor = self.coordinator.current_editor();
                            format::print_reloaded(&mut self.out, editor.as_deref())?;
                            self.prompt()?;
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "clipboard poll failed"),
                    }
                }
            }
        }

        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<Flow, ShellError> {
        match parse_input(line)? {
            Input::Blank => {}
            Input::Command(tokens) => {
                self.coordinator.run_command(&tokens)?;
                self.print_written()?;
            }
            Input::Meta(Meta::Formats) => format::print_candidates(
                &mut self.out,
                self.coordinator.candidates(),
                self.coordinator.selected(),
            )?,
            Input::Meta(Meta::Select(target)) => {
                select(&mut self.coordinator, &target)?;
                self.show()?;
            }
            Input::Meta(Meta::Show) => self.show()?,
            Input::Meta(Meta::Edit) => self.edit().await?,
            Input::Meta(Meta::Complete(partial)) => {
                let (tokens, cursor) = completion_point(&partial);
                let found = self.coordinator.complete(&tokens, cursor);
                format::print_completions(&mut self.out, &found)?;
            }
            Input::Meta(Meta::Help) => format::print_help(&mut self.out)?,
            Input::Meta(Meta::Quit) => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn show(&mut self) -> Result<(), ShellError> {
        let text = self
            .coordinator
            .buffer()
            .map(Buffer::text)
            .ok_or(SyncError::NoSelection)?;
        format::print_text(&mut self.out, text)?;
        Ok(())
    }

    async fn edit(&mut self) -> Result<(), ShellError> {
        let original = self
            .coordinator
            .buffer()
            .map(Buffer::text)
            .ok_or(SyncError::NoSelection)?
            .to_string();

        let edited = edit_in_editor(&editor_command(), &original).await?;
        if edited == original {
            writeln!(self.out, "No changes")?;
            return Ok(());
        }

        self.coordinator.edit_buffer(edited)?;
        self.print_written()
    }

    fn print_written(&mut self) -> Result<(), ShellError> {
        let editor = self.coordinator.current_editor();
        format::print_written(&mut self.out, editor.as_deref())?;
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(self.out, "{PROMPT}")?;
        self.out.flush()
    }
}

/// `$VISUAL`, then `$EDITOR`, then `vi`.
fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

/// Open `text` in the editor and return what was saved.
async fn edit_in_editor(command_line: &str, text: &str) -> Result<String, ShellError> {
    let mut words = shlex::split(command_line)
        .ok_or_else(|| ShellError::Tokenize(command_line.to_string()))?
        .into_iter();
    let program = words.next().ok_or(ShellError::NoEditor)?;

    let mut file = tempfile::Builder::new()
        .prefix("clipbench-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    tracing::debug!(%program, path = %file.path().display(), "launching editor");
    let status = tokio::process::Command::new(&program)
        .args(words)
        .arg(file.path())
        .status()
        .await?;
    if !status.success() {
        return Err(ShellError::Editor { program, status });
    }

    Ok(std::fs::read_to_string(file.path())?)
}

// -- Entry points --

/// Interactive workbench on the X11 clipboard.
pub async fn run(config: WorkbenchConfig) -> Result<(), ShellError> {
    let coordinator = SyncCoordinator::new(XclipProvider::new(config.selection), config.encoding);
    let mut shell = Shell::new(coordinator, io::stdout());
    shell
        .run(BufReader::new(tokio::io::stdin()), config.poll_interval)
        .await?;
    writeln!(shell.into_output())?;
    Ok(())
}

/// Print the candidate list.
pub fn list_formats(config: &WorkbenchConfig) -> Result<(), ShellError> {
    let coordinator = open(XclipProvider::new(config.selection), config, None)?;
    format::print_candidates(
        &mut io::stdout().lock(),
        coordinator.candidates(),
        coordinator.selected(),
    )?;
    Ok(())
}

/// Print the buffer of the default or given editor.
pub fn show(config: &WorkbenchConfig, editor: Option<&str>) -> Result<(), ShellError> {
    let coordinator = open(XclipProvider::new(config.selection), config, editor)?;
    let (Some(key), Some(buffer)) = (coordinator.current_editor(), coordinator.buffer()) else {
        return Err(SyncError::NoSelection.into());
    };
    format::print_buffer_info(&mut io::stderr().lock(), &key, buffer)?;
    format::print_text(&mut io::stdout().lock(), buffer.text())?;
    Ok(())
}

/// Apply one command to the clipboard and print the result.
pub fn run_once(
    config: &WorkbenchConfig,
    editor: Option<&str>,
    tokens: &[String],
) -> Result<(), ShellError> {
    let mut coordinator = open(XclipProvider::new(config.selection), config, editor)?;
    coordinator.run_command(tokens)?;
    if let Some(buffer) = coordinator.buffer() {
        format::print_text(&mut io::stdout().lock(), buffer.text())?;
    }
    Ok(())
}

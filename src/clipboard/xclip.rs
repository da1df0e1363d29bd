//! X11 clipboard provider: read/write via `xclip`.
//!
//! Formats come from the `TARGETS` target; each format is read with
//! `-t <format> -o` and written with `-t <format> -i`. `xclip` can only
//! serve one target per process, so a write offers the first format
//! of the snapshot (the workbench always writes exactly one).
//!
//! X11 cannot tell us that `xclip` is acting for us, so ownership is
//! tracked by content: we own the clipboard while it still holds what
//! we last wrote. Change notification is likewise a poll that compares
//! successive snapshots.

use std::io::Write;
use std::process::{Command, Stdio};

use super::{ClipboardError, ClipboardProvider, ClipboardSnapshot};

const XCLIP: &str = "xclip";

/// Which X11 selection to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Selection {
    /// The explicit copy/paste clipboard.
    Clipboard,
    /// The select-to-copy primary selection.
    Primary,
}

impl Selection {
    fn as_arg(self) -> &'static str {
        match self {
            Selection::Clipboard => "clipboard",
            Selection::Primary => "primary",
        }
    }
}

/// `xclip`-backed implementation of [`ClipboardProvider`].
#[derive(Debug)]
pub struct XclipProvider {
    selection: Selection,
    last_written: Option<ClipboardSnapshot>,
    last_seen: Option<ClipboardSnapshot>,
}

impl XclipProvider {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            last_written: None,
            last_seen: None,
        }
    }

    fn command(&self, target: &str) -> Command {
        let mut command = Command::new(XCLIP);
        command.args(["-selection", self.selection.as_arg(), "-t", target]);
        command
    }

    fn output(&self, target: &str) -> Result<Vec<u8>, ClipboardError> {
        let output = self
            .command(target)
            .arg("-o")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|source| ClipboardError::Spawn {
                tool: XCLIP,
                source,
            })?;

        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(ClipboardError::Exit {
                tool: XCLIP,
                status: output.status,
            })
        }
    }
}

impl ClipboardProvider for XclipProvider {
    fn formats(&self) -> Result<Vec<String>, ClipboardError> {
        match self.output("TARGETS") {
            Ok(stdout) => Ok(String::from_utf8_lossy(&stdout)
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()),
            // An empty selection has no owner to answer TARGETS.
            Err(ClipboardError::Exit { status, .. }) => {
                tracing::debug!(%status, "no TARGETS, treating selection as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn read(&self, format: &str) -> Result<Vec<u8>, ClipboardError> {
        self.output(format)
    }

    fn write(&mut self, content: &ClipboardSnapshot) -> Result<(), ClipboardError> {
        let (format, bytes) = content
            .iter()
            .next()
            .ok_or_else(|| ClipboardError::Rejected("empty snapshot".into()))?;
        if content.len() > 1 {
            tracing::warn!(
                count = content.len(),
                format,
                "xclip serves one target, writing only the first"
            );
        }

        let mut child = self
            .command(format)
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ClipboardError::Spawn {
                tool: XCLIP,
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(bytes)?;
            // Drop stdin to close the pipe so xclip can finish.
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(ClipboardError::Exit {
                tool: XCLIP,
                status,
            });
        }

        let written = ClipboardSnapshot::single(format, bytes.to_vec());
        self.last_seen = Some(written.clone());
        self.last_written = Some(written);
        Ok(())
    }

    fn owns_current_content(&self) -> bool {
        let Some(written) = &self.last_written else {
            return false;
        };
        match self.snapshot() {
            Ok(current) => current == *written,
            Err(e) => {
                tracing::warn!(error = %e, "ownership check failed");
                false
            }
        }
    }

    fn poll_change(&mut self) -> Result<bool, ClipboardError> {
        let current = self.snapshot()?;
        let changed = self.last_seen.as_ref() != Some(&current);
        self.last_seen = Some(current);
        Ok(changed)
    }
}

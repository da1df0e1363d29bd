use std::time::Duration;

use clap::{Parser, Subcommand};
use encoding_rs::Encoding;

use crate::clipboard::Selection;
use crate::codec::{self, CodecError};

#[derive(Parser)]
#[command(name = "clipbench", about = "Clipboard inspection and editing workbench")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// X11 selection to mirror
    #[arg(long, global = true, value_enum, default_value_t = Selection::Clipboard)]
    pub selection: Selection,

    /// Clipboard polling period in milliseconds
    #[arg(
        long,
        global = true,
        default_value_t = 250,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval_ms: u64,

    /// Force a text encoding (WHATWG label) instead of detecting it
    #[arg(long, global = true)]
    pub encoding: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive workbench (default)
    Shell,

    /// List the editors available for the current clipboard
    Formats,

    /// Print the buffer of the default or given editor
    Show {
        /// Editor index or display key, e.g. "text/html |> PlainText"
        #[arg(long)]
        editor: Option<String>,
    },

    /// Apply one text command to the clipboard
    Run {
        /// Editor index or display key
        #[arg(long)]
        editor: Option<String>,

        /// Command and its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

/// Settings shared by the shell and the one-shot subcommands.
#[derive(Debug, Clone, Copy)]
pub struct WorkbenchConfig {
    pub selection: Selection,
    pub poll_interval: Duration,
    pub encoding: Option<&'static Encoding>,
}

impl Cli {
    pub fn config(&self) -> Result<WorkbenchConfig, CodecError> {
        let encoding = self
            .encoding
            .as_deref()
            .map(codec::encoding_for_label)
            .transpose()?;
        Ok(WorkbenchConfig {
            selection: self.selection,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn defaults_to_shell() {
        let cli = parse(&["clipbench"]);
        assert!(cli.command.is_none());
        let config = cli.config().unwrap();
        assert_eq!(config.selection, Selection::Clipboard);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.encoding.is_none());
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = parse(&["clipbench", "formats", "--selection", "primary", "--encoding", "latin1"]);
        assert!(matches!(cli.command, Some(Command::Formats)));
        let config = cli.config().unwrap();
        assert_eq!(config.selection, Selection::Primary);
        assert_eq!(config.encoding, Some(encoding_rs::WINDOWS_1252));
    }

    #[test]
    fn run_takes_trailing_tokens() {
        let cli = parse(&["clipbench", "run", "--editor", "1", "--", "remove_suffix", "--force", ".txt"]);
        match cli.command {
            Some(Command::Run { editor, command }) => {
                assert_eq!(editor.as_deref(), Some("1"));
                assert_eq!(command, ["remove_suffix", "--force", ".txt"]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["clipbench", "run"]).is_err());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        assert!(Cli::try_parse_from(["clipbench", "--poll-interval-ms", "0"]).is_err());
    }

    #[test]
    fn unknown_encoding_label() {
        let cli = parse(&["clipbench", "--encoding", "klingon"]);
        assert!(matches!(cli.config(), Err(CodecError::UnknownEncoding(_))));
    }
}

//! Per-processor usage grammar.
//!
//! Each processor declares its positional arguments and boolean flags
//! as a [`Usage`]. The grammar is turned into a `clap::Command` on
//! demand and the command tokens are parsed against it. Failures name
//! the rendered usage string, e.g. `remove_prefix <prefix> [--regex] [--force]`.

use std::fmt;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches};

use super::CommandError;

/// A positional argument.
#[derive(Debug, Clone, Copy)]
pub struct Positional {
    pub name: &'static str,
    pub required: bool,
}

/// A boolean `--long` flag with an optional `-s` alias.
#[derive(Debug, Clone, Copy)]
pub struct Flag {
    pub long: &'static str,
    pub short: Option<char>,
}

/// Invocation syntax of one processor.
#[derive(Debug, Clone, Copy)]
pub struct Usage {
    pub name: &'static str,
    pub positionals: &'static [Positional],
    pub flags: &'static [Flag],
}

/// Arguments parsed against a [`Usage`].
#[derive(Debug)]
pub struct Args {
    matches: ArgMatches,
}

impl Args {
    /// Value of a positional, `None` if optional and absent.
    pub fn positional(&self, name: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(name)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// Value of a required positional. Parsing guarantees presence;
    /// an absent value reads as empty.
    pub fn required(&self, name: &str) -> &str {
        self.positional(name).unwrap_or_default()
    }

    /// Whether a declared flag was given. Undeclared flags read as
    /// unset.
    pub fn flag(&self, long: &str) -> bool {
        matches!(self.matches.try_get_one::<bool>(long), Ok(Some(true)))
    }
}

impl Usage {
    fn command(&self) -> clap::Command {
        let mut command = clap::Command::new(self.name)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .override_usage(self.to_string());

        for positional in self.positionals {
            command = command.arg(
                Arg::new(positional.name)
                    .required(positional.required)
                    .allow_hyphen_values(true)
                    .value_parser(clap::value_parser!(String)),
            );
        }
        for flag in self.flags {
            let mut arg = Arg::new(flag.long).long(flag.long).action(ArgAction::SetTrue);
            if let Some(short) = flag.short {
                arg = arg.short(short);
            }
            command = command.arg(arg);
        }
        command
    }

    /// Parse full command tokens (the command name first).
    ///
    /// Positionals may start with `-`, but a `--word` that names no
    /// declared flag is an error. Tokens after a bare `--` are values.
    pub fn parse(&self, tokens: &[String]) -> Result<Args, CommandError> {
        if let Some(unknown) = self.unknown_long_flag(tokens) {
            return Err(CommandError::Usage {
                usage: self.to_string(),
                reason: format!("unexpected argument '{unknown}'"),
            });
        }
        self.command()
            .try_get_matches_from(tokens)
            .map(|matches| Args { matches })
            .map_err(|e| self.classify(&e))
    }

    fn unknown_long_flag<'t>(&self, tokens: &'t [String]) -> Option<&'t str> {
        tokens
            .iter()
            .skip(1)
            .take_while(|token| token.as_str() != "--")
            .map(String::as_str)
            .find(|token| {
                token.strip_prefix("--").is_some_and(|long| {
                    !self.flags.iter().any(|flag| flag.long == long)
                })
            })
    }

    fn classify(&self, error: &clap::Error) -> CommandError {
        let usage = self.to_string();
        match error.kind() {
            ErrorKind::MissingRequiredArgument => CommandError::TooFewArguments { usage },
            ErrorKind::UnknownArgument if is_extra_positional(error) => {
                CommandError::TooManyArguments { usage }
            }
            _ => CommandError::Usage {
                usage,
                reason: first_line(error),
            },
        }
    }

    /// Flag completions for the word being typed.
    pub fn complete_flag(&self, word: &str) -> Vec<String> {
        if !word.starts_with('-') {
            return Vec::new();
        }
        self.flags
            .iter()
            .map(|flag| format!("--{}", flag.long))
            .filter(|candidate| candidate.starts_with(word))
            .collect()
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        for positional in self.positionals {
            if positional.required {
                write!(f, " <{}>", positional.name)?;
            } else {
                write!(f, " [{}]", positional.name)?;
            }
        }
        for flag in self.flags {
            write!(f, " [--{}]", flag.long)?;
        }
        Ok(())
    }
}

fn is_extra_positional(error: &clap::Error) -> bool {
    match error.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => !arg.starts_with('-'),
        _ => false,
    }
}

fn first_line(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REMOVE: Usage = Usage {
        name: "remove_prefix",
        positionals: &[Positional {
            name: "prefix",
            required: true,
        }],
        flags: &[
            Flag {
                long: "regex",
                short: Some('r'),
            },
            Flag {
                long: "force",
                short: Some('f'),
            },
        ],
    };

    const STRIP: Usage = Usage {
        name: "strip",
        positionals: &[Positional {
            name: "chars",
            required: false,
        }],
        flags: &[],
    };

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    // -- Rendering --

    #[test]
    fn usage_string_rendering() {
        assert_eq!(REMOVE.to_string(), "remove_prefix <prefix> [--regex] [--force]");
        assert_eq!(STRIP.to_string(), "strip [chars]");
    }

    // -- Parsing --

    #[test]
    fn flags_anywhere() {
        let args = REMOVE.parse(&tokens(&["remove_prefix", "--force", ".txt"])).unwrap();
        assert_eq!(args.required("prefix"), ".txt");
        assert!(args.flag("force"));
        assert!(!args.flag("regex"));
    }

    #[test]
    fn short_flags() {
        let args = REMOVE.parse(&tokens(&["remove_prefix", "x", "-r", "-f"])).unwrap();
        assert!(args.flag("regex"));
        assert!(args.flag("force"));
    }

    #[test]
    fn hyphen_values_accepted() {
        let args = REMOVE.parse(&tokens(&["remove_prefix", "-x"])).unwrap();
        assert_eq!(args.required("prefix"), "-x");
    }

    #[test]
    fn empty_value_accepted() {
        let args = REMOVE.parse(&tokens(&["remove_prefix", ""])).unwrap();
        assert_eq!(args.required("prefix"), "");
    }

    #[test]
    fn optional_positional_absent() {
        let args = STRIP.parse(&tokens(&["strip"])).unwrap();
        assert_eq!(args.positional("chars"), None);
    }

    // -- Errors --

    #[test]
    fn too_few_arguments() {
        let err = REMOVE.parse(&tokens(&["remove_prefix"])).unwrap_err();
        assert!(matches!(err, CommandError::TooFewArguments { .. }));
        assert!(err.to_string().contains("remove_prefix <prefix> [--regex] [--force]"));
    }

    #[test]
    fn too_many_arguments() {
        let err = STRIP.parse(&tokens(&["strip", "a", "b"])).unwrap_err();
        assert!(matches!(err, CommandError::TooManyArguments { .. }));
    }

    #[test]
    fn unknown_flag_is_usage_error() {
        let err = REMOVE.parse(&tokens(&["remove_prefix", "x", "--bogus"])).unwrap_err();
        match err {
            CommandError::Usage { usage, .. } => {
                assert_eq!(usage, "remove_prefix <prefix> [--regex] [--force]");
            }
            other => panic!("expected usage error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_long_flag_before_value_is_usage_error() {
        let err = REMOVE.parse(&tokens(&["remove_prefix", "--bogus", "x"])).unwrap_err();
        assert!(matches!(err, CommandError::Usage { .. }));
        assert!(err.to_string().starts_with("unexpected argument '--bogus'"));
    }

    #[test]
    fn misspelled_flag_is_not_a_value() {
        let err = REMOVE.parse(&tokens(&["remove_prefix", "--froce"])).unwrap_err();
        assert!(matches!(err, CommandError::Usage { .. }));
    }

    #[test]
    fn double_dash_escapes_values() {
        let args = REMOVE
            .parse(&tokens(&["remove_prefix", "--force", "--", "--bogus"]))
            .unwrap();
        assert_eq!(args.required("prefix"), "--bogus");
        assert!(args.flag("force"));
    }

    // -- Completion --

    #[test]
    fn flag_completion() {
        assert_eq!(REMOVE.complete_flag("--f"), ["--force"]);
        assert_eq!(REMOVE.complete_flag("-"), ["--regex", "--force"]);
        assert!(REMOVE.complete_flag("fo").is_empty());
    }
}

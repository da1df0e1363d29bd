//! Text command dispatch.
//!
//! A command line is a token list. The first token is a command or an
//! alias; aliases resolve (possibly through other aliases) to a
//! canonical `namespace.command` name, which selects a [`Processor`]
//! from the registry. Processors declare which clipboard formats they
//! run against and their own argument grammar ([`usage::Usage`]).
//!
//! Unknown commands and commands unavailable for the current format
//! produce the same [`CommandError::UnknownCommand`].

pub mod line;
pub mod usage;

use usage::{Args, Usage};

/// Errors returned by command dispatch and processors.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("no such command: `{0}`")]
    UnknownCommand(String),

    #[error("alias cycle: {0}")]
    AliasCycle(String),

    #[error("too few arguments; usage: {usage}")]
    TooFewArguments { usage: String },

    #[error("too many arguments; usage: {usage}")]
    TooManyArguments { usage: String },

    #[error("{reason}; usage: {usage}")]
    Usage { usage: String, reason: String },

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A forced transform did not apply to some line.
    #[error("line {line}: {reason}")]
    Constraint { line: usize, reason: String },
}

/// What a command runs against.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// Format of the selected editor, `None` when nothing is selected.
    pub current_format: Option<&'a str>,
    /// Current buffer text.
    pub text: &'a str,
}

/// Cursor position inside a token list: token index and byte offset
/// within that token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub token: usize,
    pub offset: usize,
}

/// A text transformation invoked by name.
pub trait Processor {
    /// Declared identifier, matched case-insensitively.
    fn name(&self) -> &'static str {
        self.usage().name
    }

    fn usage(&self) -> &'static Usage;

    /// Whether the processor can run against `format`.
    fn available(&self, format: Option<&str>) -> bool;

    /// Transform `text`, returning the new buffer text.
    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError>;

    /// Completions for the argument under `cursor`.
    fn complete(&self, tokens: &[String], cursor: Cursor) -> Vec<String> {
        tokens
            .get(cursor.token)
            .map(|word| self.usage().complete_flag(prefix_at(word, cursor.offset).0))
            .unwrap_or_default()
    }
}

/// A named group of processors.
struct Namespace {
    name: &'static str,
    processors: Vec<Box<dyn Processor>>,
}

/// Alias table and processor registry. Built once at startup.
pub struct Dispatcher {
    aliases: Vec<(String, String)>,
    namespaces: Vec<Namespace>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self::empty();
        dispatcher.register("line", line::processors());
        for (alias, target) in line::ALIASES {
            dispatcher.add_alias(*alias, *target);
        }
        dispatcher
    }
}

impl Dispatcher {
    /// A dispatcher with no commands or aliases.
    pub fn empty() -> Self {
        Self {
            aliases: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn register(&mut self, namespace: &'static str, processors: Vec<Box<dyn Processor>>) {
        self.namespaces.push(Namespace {
            name: namespace,
            processors,
        });
    }

    /// Add or replace an alias.
    pub fn add_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        let alias = alias.into();
        let target = target.into();
        match self.aliases.iter_mut().find(|(a, _)| *a == alias) {
            Some((_, existing)) => *existing = target,
            None => self.aliases.push((alias, target)),
        }
    }

    fn alias_target(&self, name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| target.as_str())
    }

    /// Follow aliases until a name that is not an alias.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> Result<&'a str, CommandError> {
        let mut chain = vec![name];
        let mut current = name;
        while let Some(target) = self.alias_target(current) {
            if chain.contains(&target) {
                chain.push(target);
                return Err(CommandError::AliasCycle(chain.join(" -> ")));
            }
            chain.push(target);
            current = target;
        }
        Ok(current)
    }

    /// Find the processor a typed command name refers to.
    pub fn lookup(&self, token: &str) -> Result<&dyn Processor, CommandError> {
        let canonical = self.resolve_alias(token)?;
        let unknown = || CommandError::UnknownCommand(token.to_string());

        let (namespace, command) = canonical.rsplit_once('.').ok_or_else(unknown)?;
        self.namespaces
            .iter()
            .filter(|ns| ns.name.eq_ignore_ascii_case(namespace))
            .flat_map(|ns| ns.processors.iter())
            .find(|p| p.name().eq_ignore_ascii_case(command))
            .map(|p| &**p)
            .ok_or_else(unknown)
    }

    /// Run a tokenized command line against `context`, returning the
    /// new buffer text.
    pub fn run(&self, tokens: &[String], context: &CommandContext<'_>) -> Result<String, CommandError> {
        let first = tokens.first().ok_or(CommandError::Empty)?;
        let processor = self.lookup(first)?;

        if !processor.available(context.current_format) {
            tracing::debug!(
                command = %first,
                format = ?context.current_format,
                "command unavailable for format"
            );
            return Err(CommandError::UnknownCommand(first.clone()));
        }

        let args = processor.usage().parse(tokens)?;
        tracing::debug!(command = %first, processor = processor.name(), "running command");
        processor.process(&args, context.text)
    }

    /// Every alias and canonical command name, deduplicated, in
    /// registration order.
    pub fn all_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: String| {
            if !names.contains(&name) {
                names.push(name);
            }
        };

        for (alias, target) in &self.aliases {
            push(alias.clone());
            push(target.clone());
        }
        for namespace in &self.namespaces {
            for processor in &namespace.processors {
                push(format!("{}.{}", namespace.name, processor.name()));
            }
        }
        names
    }

    /// Completions at `cursor`.
    ///
    /// In the first token, every command name matching the text before
    /// and after the cursor. Elsewhere, the resolved processor's own
    /// completions.
    pub fn complete(&self, tokens: &[String], cursor: Cursor) -> Vec<String> {
        let Some(first) = tokens.first() else {
            return self.all_commands();
        };

        if cursor.token == 0 {
            let (before, after) = prefix_at(first, cursor.offset);
            return self
                .all_commands()
                .into_iter()
                .filter(|name| {
                    name.len() >= before.len() + after.len()
                        && name.starts_with(before)
                        && name.ends_with(after)
                })
                .collect();
        }

        match self.lookup(first) {
            Ok(processor) => processor.complete(tokens, cursor),
            Err(_) => Vec::new(),
        }
    }
}

/// Split `word` at `offset`, clamped to the word and moved back to a
/// char boundary.
fn prefix_at(word: &str, offset: usize) -> (&str, &str) {
    let mut offset = offset.min(word.len());
    while !word.is_char_boundary(offset) {
        offset -= 1;
    }
    word.split_at(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn plain(text: &str) -> CommandContext<'_> {
        CommandContext {
            current_format: Some("text/plain"),
            text,
        }
    }

    // -- Alias resolution --

    #[test]
    fn default_aliases_terminate() {
        let dispatcher = Dispatcher::default();
        for name in dispatcher.all_commands() {
            assert!(dispatcher.resolve_alias(&name).is_ok(), "{name}");
        }
    }

    #[test]
    fn alias_chain_resolves() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.resolve_alias("prefix").unwrap(), "line.add_prefix");
        assert_eq!(dispatcher.resolve_alias("r.prefix").unwrap(), "line.add_prefix");
        assert_eq!(dispatcher.resolve_alias("line.grep").unwrap(), "line.grep");
    }

    #[test]
    fn alias_cycle_detected() {
        let mut dispatcher = Dispatcher::default();
        dispatcher.add_alias("a", "b");
        dispatcher.add_alias("b", "a");
        let err = dispatcher.resolve_alias("a").unwrap_err();
        match err {
            CommandError::AliasCycle(chain) => assert_eq!(chain, "a -> b -> a"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn self_alias_is_a_cycle() {
        let mut dispatcher = Dispatcher::empty();
        dispatcher.add_alias("loop", "loop");
        assert!(matches!(
            dispatcher.run(&tokens(&["loop"]), &plain("")),
            Err(CommandError::AliasCycle(_))
        ));
    }

    // -- Lookup --

    #[test]
    fn canonical_names_case_folded() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.lookup("line.ADD_PREFIX").unwrap().name(), "add_prefix");
        assert_eq!(dispatcher.lookup("Line.grep").unwrap().name(), "grep");
    }

    #[test]
    fn unknown_command_names_typed_token() {
        let dispatcher = Dispatcher::default();
        for typed in ["nope", "line.nope", "nosuch.add_prefix"] {
            match dispatcher.lookup(typed) {
                Err(CommandError::UnknownCommand(token)) => assert_eq!(token, typed),
                Err(other) => panic!("unexpected error {other:?}"),
                Ok(_) => panic!("{typed} should not resolve"),
            }
        }
    }

    #[test]
    fn unknown_through_alias_names_alias() {
        let mut dispatcher = Dispatcher::default();
        dispatcher.add_alias("dangling", "line.gone");
        let err = dispatcher.run(&tokens(&["dangling"]), &plain("")).unwrap_err();
        assert_eq!(err.to_string(), "no such command: `dangling`");
    }

    // -- Run --

    #[test]
    fn empty_line_rejected() {
        let dispatcher = Dispatcher::default();
        assert!(matches!(
            dispatcher.run(&[], &plain("x")),
            Err(CommandError::Empty)
        ));
    }

    #[test]
    fn run_through_alias() {
        let dispatcher = Dispatcher::default();
        let out = dispatcher
            .run(&tokens(&["r.prefix", ">> "]), &plain("a\nb"))
            .unwrap();
        assert_eq!(out, ">> a\n>> b");
    }

    #[test]
    fn unknown_long_flag_is_usage_error() {
        let dispatcher = Dispatcher::default();
        let err = dispatcher
            .run(&tokens(&["remove_prefix", "--bogus", "x"]), &plain("abc"))
            .unwrap_err();
        match err {
            CommandError::Usage { usage, .. } => {
                assert_eq!(usage, "remove_prefix <prefix> [--regex] [--force]");
            }
            other => panic!("expected usage error, got {other:?}"),
        }

        let err = dispatcher
            .run(&tokens(&["remove_suffix", "--froce"]), &plain("a--froce"))
            .unwrap_err();
        assert!(matches!(err, CommandError::Usage { .. }));
    }

    #[test]
    fn unavailable_looks_like_unknown() {
        let dispatcher = Dispatcher::default();
        let context = CommandContext {
            current_format: Some("text/html"),
            text: "<p>x</p>",
        };
        let err = dispatcher.run(&tokens(&["grep", "x"]), &context).unwrap_err();
        assert_eq!(err.to_string(), "no such command: `grep`");

        let context = CommandContext {
            current_format: None,
            text: "",
        };
        assert!(matches!(
            dispatcher.run(&tokens(&["grep", "x"]), &context),
            Err(CommandError::UnknownCommand(_))
        ));
    }

    #[test]
    fn argument_errors_surface() {
        let dispatcher = Dispatcher::default();
        assert!(matches!(
            dispatcher.run(&tokens(&["replace", "a"]), &plain("a")),
            Err(CommandError::TooFewArguments { .. })
        ));
        assert!(matches!(
            dispatcher.run(&tokens(&["add_prefix", "a", "b"]), &plain("a")),
            Err(CommandError::TooManyArguments { .. })
        ));
    }

    // -- Completion --

    #[test]
    fn completion_lists_everything_for_empty_line() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.complete(&[], Cursor { token: 0, offset: 0 }), dispatcher.all_commands());
    }

    #[test]
    fn completion_by_prefix() {
        let dispatcher = Dispatcher::default();
        let found = dispatcher.complete(&tokens(&["r."]), Cursor { token: 0, offset: 2 });
        assert_eq!(found, ["r.prefix", "r.suffix", "r.replace"]);
    }

    #[test]
    fn completion_in_middle_of_word() {
        let dispatcher = Dispatcher::default();
        // Cursor after "add_", with "fix" typed after it.
        let found = dispatcher.complete(&tokens(&["add_fix"]), Cursor { token: 0, offset: 4 });
        assert_eq!(found, ["add_prefix", "add_suffix"]);
    }

    #[test]
    fn completion_delegates_to_processor() {
        let dispatcher = Dispatcher::default();
        let found = dispatcher.complete(
            &tokens(&["remove_suffix", ".txt", "--f"]),
            Cursor { token: 2, offset: 3 },
        );
        assert_eq!(found, ["--force"]);

        let found = dispatcher.complete(&tokens(&["bogus", "--f"]), Cursor { token: 1, offset: 3 });
        assert!(found.is_empty());
    }

    #[test]
    fn all_commands_deduplicated() {
        let dispatcher = Dispatcher::default();
        let names = dispatcher.all_commands();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
        assert!(names.contains(&"line.remove_suffix".to_string()));
    }
}

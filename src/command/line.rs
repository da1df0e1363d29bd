//! Line-wise text processors (the `line` namespace).
//!
//! Every processor maps each line of the buffer to zero or more output
//! lines. Line terminators are split off before the transform and
//! reattached verbatim afterwards, so `\r\n` stays `\r\n` and a missing
//! final newline stays missing. All of them run on `text/plain` only.

use regex::{Regex, RegexBuilder};

use super::usage::{Args, Flag, Positional, Usage};
use super::{CommandError, Processor};
use crate::editor::TEXT_PLAIN;

/// Shorthands shipped with the workbench.
pub const ALIASES: &[(&str, &str)] = &[
    ("add_prefix", "line.add_prefix"),
    ("add_suffix", "line.add_suffix"),
    ("replace", "line.replace"),
    ("sub", "line.sub"),
    ("grep", "line.grep"),
    ("strip", "line.strip"),
    ("lstrip", "line.lstrip"),
    ("rstrip", "line.rstrip"),
    ("remove_prefix", "line.remove_prefix"),
    ("remove_suffix", "line.remove_suffix"),
    ("r.prefix", "line.add_prefix"),
    ("r.suffix", "line.add_suffix"),
    ("r.replace", "line.replace"),
    ("prefix", "r.prefix"),
    ("suffix", "r.suffix"),
];

/// All processors of this namespace.
pub fn processors() -> Vec<Box<dyn Processor>> {
    vec![
        Box::new(AddPrefix),
        Box::new(AddSuffix),
        Box::new(Replace),
        Box::new(Sub),
        Box::new(Grep),
        Box::new(Strip(Side::Both)),
        Box::new(Strip(Side::Left)),
        Box::new(Strip(Side::Right)),
        Box::new(RemoveAffix(Side::Left)),
        Box::new(RemoveAffix(Side::Right)),
    ]
}

const LONE_TERMINATORS: &[char] = &[
    '\n', '\r', '\x0b', '\x0c', '\x1c', '\x1d', '\x1e', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Split `text` into `(content, terminator)` pairs. The last line has
/// an empty terminator if the text does not end with one.
pub fn split_lines(text: &str) -> Vec<(&str, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !LONE_TERMINATORS.contains(&c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        if c == '\r' && chars.peek().is_some_and(|&(_, next)| next == '\n') {
            chars.next();
            end += 1;
        }
        lines.push((&text[start..i], &text[i..end]));
        start = end;
    }
    if start < text.len() {
        lines.push((&text[start..], ""));
    }
    lines
}

/// Apply `f` to each line's content and reassemble. Every output line
/// gets the input line's terminator. Fails as a whole if `f` fails on
/// any line.
pub fn with_each_line<F>(text: &str, mut f: F) -> Result<String, CommandError>
where
    F: FnMut(usize, &str) -> Result<Vec<String>, CommandError>,
{
    let mut out = String::with_capacity(text.len());
    for (index, (content, terminator)) in split_lines(text).into_iter().enumerate() {
        for line in f(index + 1, content)? {
            out.push_str(&line);
            out.push_str(terminator);
        }
    }
    Ok(out)
}

/// Map every line one-to-one.
fn map_lines(text: &str, mut f: impl FnMut(&str) -> String) -> String {
    split_lines(text)
        .into_iter()
        .flat_map(|(content, terminator)| [f(content), terminator.to_string()])
        .collect()
}

fn plain_text_only(format: Option<&str>) -> bool {
    format == Some(TEXT_PLAIN)
}

const IGNORE_CASE: Flag = Flag {
    long: "ignore-case",
    short: Some('i'),
};

fn compile(pattern: &str, ignore_case: bool) -> Result<Regex, CommandError> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()?)
}

// -- add_prefix / add_suffix --

struct AddPrefix;

static ADD_PREFIX: Usage = Usage {
    name: "add_prefix",
    positionals: &[Positional {
        name: "prefix",
        required: true,
    }],
    flags: &[],
};

impl Processor for AddPrefix {
    fn usage(&self) -> &'static Usage {
        &ADD_PREFIX
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let prefix = args.required("prefix");
        Ok(map_lines(text, |line| format!("{prefix}{line}")))
    }
}

struct AddSuffix;

static ADD_SUFFIX: Usage = Usage {
    name: "add_suffix",
    positionals: &[Positional {
        name: "suffix",
        required: true,
    }],
    flags: &[],
};

impl Processor for AddSuffix {
    fn usage(&self) -> &'static Usage {
        &ADD_SUFFIX
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let suffix = args.required("suffix");
        Ok(map_lines(text, |line| format!("{line}{suffix}")))
    }
}

// -- replace / sub --

struct Replace;

static REPLACE: Usage = Usage {
    name: "replace",
    positionals: &[
        Positional {
            name: "from",
            required: true,
        },
        Positional {
            name: "to",
            required: true,
        },
    ],
    flags: &[],
};

impl Processor for Replace {
    fn usage(&self) -> &'static Usage {
        &REPLACE
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let from = args.required("from");
        let to = args.required("to");
        Ok(map_lines(text, |line| line.replace(from, to)))
    }
}

/// First-match regex substitution. `$1`/`${name}` expand in the
/// replacement.
struct Sub;

static SUB: Usage = Usage {
    name: "sub",
    positionals: &[
        Positional {
            name: "pattern",
            required: true,
        },
        Positional {
            name: "replacement",
            required: true,
        },
    ],
    flags: &[IGNORE_CASE],
};

impl Processor for Sub {
    fn usage(&self) -> &'static Usage {
        &SUB
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let regex = compile(args.required("pattern"), args.flag("ignore-case"))?;
        let replacement = args.required("replacement");
        Ok(map_lines(text, |line| {
            regex.replace(line, replacement).into_owned()
        }))
    }
}

// -- grep --

struct Grep;

static GREP: Usage = Usage {
    name: "grep",
    positionals: &[Positional {
        name: "pattern",
        required: true,
    }],
    flags: &[
        Flag {
            long: "invert",
            short: Some('v'),
        },
        IGNORE_CASE,
    ],
};

impl Processor for Grep {
    fn usage(&self) -> &'static Usage {
        &GREP
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let regex = compile(args.required("pattern"), args.flag("ignore-case"))?;
        let invert = args.flag("invert");
        with_each_line(text, |_, line| {
            Ok(if regex.is_match(line) != invert {
                vec![line.to_string()]
            } else {
                Vec::new()
            })
        })
    }
}

// -- strip / lstrip / rstrip --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
}

struct Strip(Side);

const STRIP_CHARS: &[Positional] = &[Positional {
    name: "chars",
    required: false,
}];

static STRIP: Usage = Usage {
    name: "strip",
    positionals: STRIP_CHARS,
    flags: &[],
};

static LSTRIP: Usage = Usage {
    name: "lstrip",
    positionals: STRIP_CHARS,
    flags: &[],
};

static RSTRIP: Usage = Usage {
    name: "rstrip",
    positionals: STRIP_CHARS,
    flags: &[],
};

impl Processor for Strip {
    fn usage(&self) -> &'static Usage {
        match self.0 {
            Side::Both => &STRIP,
            Side::Left => &LSTRIP,
            Side::Right => &RSTRIP,
        }
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let chars = args.positional("chars");
        let matches = |c: char| match chars {
            Some(set) => set.contains(c),
            None => c.is_whitespace(),
        };
        let side = self.0;
        Ok(map_lines(text, |line| {
            match side {
                Side::Both => line.trim_matches(matches),
                Side::Left => line.trim_start_matches(matches),
                Side::Right => line.trim_end_matches(matches),
            }
            .to_string()
        }))
    }
}

// -- remove_prefix / remove_suffix --

/// Removes a literal or regex prefix (`Side::Left`) or suffix
/// (`Side::Right`). With `--force`, a line without it is an error.
struct RemoveAffix(Side);

const AFFIX_FLAGS: &[Flag] = &[
    Flag {
        long: "regex",
        short: Some('r'),
    },
    Flag {
        long: "force",
        short: Some('f'),
    },
];

static REMOVE_PREFIX: Usage = Usage {
    name: "remove_prefix",
    positionals: &[Positional {
        name: "prefix",
        required: true,
    }],
    flags: AFFIX_FLAGS,
};

static REMOVE_SUFFIX: Usage = Usage {
    name: "remove_suffix",
    positionals: &[Positional {
        name: "suffix",
        required: true,
    }],
    flags: AFFIX_FLAGS,
};

enum Affix<'a> {
    Literal(&'a str),
    Pattern(Regex),
}

impl RemoveAffix {
    fn strip<'l>(&self, affix: &Affix<'_>, line: &'l str) -> Option<&'l str> {
        match (affix, self.0) {
            (Affix::Literal(s), Side::Right) => line.strip_suffix(*s),
            (Affix::Literal(s), _) => line.strip_prefix(*s),
            (Affix::Pattern(re), Side::Right) => re.find(line).map(|m| &line[..m.start()]),
            (Affix::Pattern(re), _) => re.find(line).map(|m| &line[m.end()..]),
        }
    }

    fn noun(&self) -> &'static str {
        match self.0 {
            Side::Right => "suffix",
            _ => "prefix",
        }
    }
}

impl Processor for RemoveAffix {
    fn usage(&self) -> &'static Usage {
        match self.0 {
            Side::Right => &REMOVE_SUFFIX,
            _ => &REMOVE_PREFIX,
        }
    }

    fn available(&self, format: Option<&str>) -> bool {
        plain_text_only(format)
    }

    fn process(&self, args: &Args, text: &str) -> Result<String, CommandError> {
        let raw = args.required(self.noun());
        if raw.is_empty() {
            return Ok(text.to_string());
        }

        let affix = if args.flag("regex") {
            let anchored = match self.0 {
                Side::Right => format!("(?:{raw})$"),
                _ => format!("^(?:{raw})"),
            };
            Affix::Pattern(Regex::new(&anchored)?)
        } else {
            Affix::Literal(raw)
        };
        let force = args.flag("force");

        with_each_line(text, |number, line| match self.strip(&affix, line) {
            Some(rest) => Ok(vec![rest.to_string()]),
            None if force => Err(CommandError::Constraint {
                line: number,
                reason: format!("no {} matching {raw:?} in {line:?}", self.noun()),
            }),
            None => Ok(vec![line.to_string()]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandContext, Dispatcher};

    fn run(words: &[&str], text: &str) -> Result<String, CommandError> {
        let tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        Dispatcher::default().run(
            &tokens,
            &CommandContext {
                current_format: Some(TEXT_PLAIN),
                text,
            },
        )
    }

    // -- Line splitting --

    #[test]
    fn split_keeps_terminators() {
        assert_eq!(
            split_lines("a\nb\r\nc\rd"),
            [("a", "\n"), ("b", "\r\n"), ("c", "\r"), ("d", "")]
        );
    }

    #[test]
    fn split_trailing_newline_has_no_empty_tail() {
        assert_eq!(split_lines("a\n"), [("a", "\n")]);
        assert_eq!(split_lines(""), Vec::<(&str, &str)>::new());
        assert_eq!(split_lines("\n\n"), [("", "\n"), ("", "\n")]);
    }

    #[test]
    fn split_unicode_separators() {
        assert_eq!(
            split_lines("a\u{2028}b\u{85}c"),
            [("a", "\u{2028}"), ("b", "\u{85}"), ("c", "")]
        );
    }

    // -- Prefix / suffix --

    #[test]
    fn add_prefix_every_line() {
        assert_eq!(run(&["add_prefix", ">> "], "Hello\n").unwrap(), ">> Hello\n");
        assert_eq!(run(&["add_prefix", "- "], "a\r\nb").unwrap(), "- a\r\n- b");
    }

    #[test]
    fn add_suffix_before_terminator() {
        assert_eq!(run(&["add_suffix", ";"], "a\nb\n").unwrap(), "a;\nb;\n");
    }

    #[test]
    fn prefix_round_trip_with_mixed_terminators() {
        let text = "one\r\ntwo\nthree\rfour";
        let prefixed = run(&["add_prefix", "# "], text).unwrap();
        let restored = run(&["remove_prefix", "--force", "# "], &prefixed).unwrap();
        assert_eq!(restored, text);
    }

    // -- Replace / sub --

    #[test]
    fn replace_all_occurrences_per_line() {
        assert_eq!(run(&["replace", "a", "o"], "banana\naa").unwrap(), "bonono\noo");
    }

    #[test]
    fn replace_empty_pattern_inserts_between_chars() {
        assert_eq!(run(&["replace", "", "-"], "abc\n").unwrap(), "-a-b-c-\n");
    }

    #[test]
    fn sub_first_match_only() {
        assert_eq!(run(&["sub", "a+", "X"], "baaaca\n").unwrap(), "bXca\n");
    }

    #[test]
    fn sub_expands_groups() {
        assert_eq!(
            run(&["sub", r"(\w+)=(\w+)", "$2=$1"], "k=v\nx=y").unwrap(),
            "v=k\ny=x"
        );
    }

    #[test]
    fn sub_invalid_regex() {
        assert!(matches!(
            run(&["sub", "(", "x"], "a"),
            Err(CommandError::InvalidRegex(_))
        ));
    }

    // -- Grep --

    #[test]
    fn grep_keeps_matching_lines() {
        assert_eq!(run(&["grep", "foo"], "foo\nbar\nfoobar\n").unwrap(), "foo\nfoobar\n");
    }

    #[test]
    fn grep_invert_and_ignore_case() {
        assert_eq!(run(&["grep", "foo", "-v"], "foo\nbar\nFOO\n").unwrap(), "bar\nFOO\n");
        assert_eq!(run(&["grep", "foo", "-i"], "foo\nbar\nFOO\n").unwrap(), "foo\nFOO\n");
    }

    // -- Strip --

    #[test]
    fn strip_whitespace_by_default() {
        assert_eq!(run(&["strip"], "  a \t\n b\n").unwrap(), "a\nb\n");
        assert_eq!(run(&["lstrip"], "  a  \n").unwrap(), "a  \n");
        assert_eq!(run(&["rstrip"], "  a  \n").unwrap(), "  a\n");
    }

    #[test]
    fn strip_given_chars() {
        assert_eq!(run(&["strip", "*-"], "-*a*-\n*b").unwrap(), "a\nb");
        assert_eq!(run(&["rstrip", "x"], "axx").unwrap(), "a");
    }

    // -- Remove prefix / suffix --

    #[test]
    fn remove_prefix_passes_non_matching() {
        assert_eq!(
            run(&["remove_prefix", "# "], "# a\nb\n# c\n").unwrap(),
            "a\nb\nc\n"
        );
    }

    #[test]
    fn remove_suffix_forced_mismatch_fails() {
        let err = run(&["remove_suffix", "--force", ".txt"], "readme").unwrap_err();
        match err {
            CommandError::Constraint { line, .. } => assert_eq!(line, 1),
            other => panic!("expected constraint error, got {other:?}"),
        }
    }

    #[test]
    fn remove_suffix_literal() {
        assert_eq!(
            run(&["remove_suffix", ".txt", "-f"], "a.txt\nb.txt\n").unwrap(),
            "a\nb\n"
        );
    }

    #[test]
    fn remove_affix_regex_anchored() {
        assert_eq!(
            run(&["remove_prefix", "--regex", r"\d+\. "], "1. a\n22. b\nc 3. \n").unwrap(),
            "a\nb\nc 3. \n"
        );
        assert_eq!(
            run(&["remove_suffix", r"\s*#.*", "-r"], "x = 1  # one\ny").unwrap(),
            "x = 1\ny"
        );
    }

    #[test]
    fn empty_affix_is_noop_even_forced() {
        assert_eq!(run(&["remove_prefix", "--force", ""], "abc\n").unwrap(), "abc\n");
        assert_eq!(run(&["remove_suffix", "", "-f", "-r"], "abc").unwrap(), "abc");
    }

    #[test]
    fn forced_regex_mismatch_names_line() {
        let err = run(&["remove_prefix", "a", "-f", "-r"], "ab\nb\n").unwrap_err();
        assert!(matches!(err, CommandError::Constraint { line: 2, .. }));
    }
}

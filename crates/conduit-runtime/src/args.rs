//! Command-line tokenizing, Unix-style argument parsing, and parameter
//! validation.
//!
//! Parsing happens in two passes. [`ArgList::parse`] classifies tokens into
//! flags and values without knowing the target command. [`ParamSpec::bind`]
//! then attaches option values, checks arity and required flags, and
//! produces the [`ParsedArgs`] a command executes with.

use std::collections::BTreeMap;

use conduit_types::error::{ConduitError, Result};

// ---------------------------------------------------------------------------
// Tokenizer: handles single quotes, double quotes, and backslash escapes.
// ---------------------------------------------------------------------------

/// Tokenize a command line respecting quotes and backslash escapes.
///
/// - Single-quoted strings preserve all characters literally.
/// - Inside double quotes, `\"` and `\\` are escapes; other backslashes are kept.
/// - Backslash escapes the next character outside of quotes.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Distinguishes `""` (an empty argument) from no token at all.
    let mut has_token = false;
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            if ch == '"' {
                in_double = false;
            } else if ch == '\\'
                && let Some(&next) = chars.peek()
                && (next == '"' || next == '\\')
            {
                current.push(next);
                chars.next();
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    has_token = true;
                },
                '"' => {
                    in_double = true;
                    has_token = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        has_token = true;
                    }
                },
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                },
                _ => {
                    current.push(ch);
                    has_token = true;
                },
            }
        }
    }

    if in_single {
        return Err(ConduitError::Syntax("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(ConduitError::Syntax("unterminated double quote".to_string()));
    }

    if has_token {
        tokens.push(current);
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Unix-style classification
// ---------------------------------------------------------------------------

/// One classified token following the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgItem {
    /// `--name` or `--name=value`.
    Long { name: String, value: Option<String> },
    /// `-x`; clusters like `-abc` yield one item per letter.
    Short(char),
    /// A positional value (or a candidate option value).
    Value(String),
}

/// A tokenized command line split into command name and classified items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    pub command: Option<String>,
    pub items: Vec<ArgItem>,
}

impl ArgList {
    /// Classify tokens. The first token is always the command name.
    ///
    /// `--` ends flag parsing; a lone `-` and negative numbers are values.
    pub fn parse(tokens: Vec<String>) -> Self {
        let mut iter = tokens.into_iter();
        let command = iter.next();
        let mut items = Vec::new();
        let mut flags_done = false;

        for tok in iter {
            if flags_done {
                items.push(ArgItem::Value(tok));
                continue;
            }
            if tok == "--" {
                flags_done = true;
                continue;
            }
            if let Some(long) = tok.strip_prefix("--") {
                let (name, value) = match long.split_once('=') {
                    Some((n, v)) => (n.to_string(), Some(v.to_string())),
                    None => (long.to_string(), None),
                };
                items.push(ArgItem::Long { name, value });
            } else if is_short_cluster(&tok) {
                items.extend(tok.chars().skip(1).map(ArgItem::Short));
            } else {
                items.push(ArgItem::Value(tok));
            }
        }

        Self { command, items }
    }
}

fn is_short_cluster(tok: &str) -> bool {
    let mut chars = tok.chars();
    chars.next() == Some('-')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
}

/// Tokenize and classify a raw command line.
pub fn parse_line(input: &str) -> Result<ArgList> {
    Ok(ArgList::parse(tokenize(input)?))
}

// ---------------------------------------------------------------------------
// Parameter specification
// ---------------------------------------------------------------------------

/// One flag accepted by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    pub long: String,
    pub short: Option<char>,
    pub takes_value: bool,
    pub required: bool,
}

impl FlagSpec {
    /// A boolean flag (`--verbose`).
    pub fn switch(long: &str) -> Self {
        Self {
            long: long.to_string(),
            short: None,
            takes_value: false,
            required: false,
        }
    }

    /// A flag carrying a value (`--topic orders` or `--topic=orders`).
    pub fn option(long: &str) -> Self {
        Self {
            takes_value: true,
            ..Self::switch(long)
        }
    }

    pub fn short(mut self, c: char) -> Self {
        self.short = Some(c);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Flags and positional arity a command accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    flags: Vec<FlagSpec>,
    min_positional: usize,
    max_positional: Option<usize>,
    permissive: bool,
}

impl ParamSpec {
    /// No flags, no positionals. Extend with the builder methods.
    pub fn new() -> Self {
        Self {
            flags: Vec::new(),
            min_positional: 0,
            max_positional: Some(0),
            permissive: false,
        }
    }

    /// Accept anything: unknown flags are recorded as switches (or with
    /// their inline `=value`), any number of positionals.
    pub fn any() -> Self {
        Self {
            flags: Vec::new(),
            min_positional: 0,
            max_positional: None,
            permissive: true,
        }
    }

    pub fn flag(mut self, flag: FlagSpec) -> Self {
        self.flags.push(flag);
        self
    }

    /// Positional arity; `max = None` means unbounded.
    pub fn positionals(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_positional = min;
        self.max_positional = max;
        self
    }

    pub fn flags(&self) -> &[FlagSpec] {
        &self.flags
    }

    fn find_long(&self, name: &str) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.long == name)
    }

    fn find_short(&self, c: char) -> Option<&FlagSpec> {
        self.flags.iter().find(|f| f.short == Some(c))
    }

    /// Bind classified items to this spec.
    ///
    /// Fails with [`ConduitError::InvalidArguments`] on unknown flags,
    /// missing or unexpected option values, missing required flags, and
    /// positional counts outside the declared range.
    pub fn bind(&self, list: &ArgList) -> Result<ParsedArgs> {
        let command = list.command.clone().unwrap_or_default();
        let invalid = |reason: String| ConduitError::InvalidArguments {
            command: command.clone(),
            reason,
        };

        let mut parsed = ParsedArgs::new(&command);
        let mut items = list.items.iter().peekable();

        while let Some(item) = items.next() {
            let (spec, display, inline) = match item {
                ArgItem::Value(v) => {
                    parsed.positionals.push(v.clone());
                    continue;
                },
                ArgItem::Long { name, value } => {
                    (self.find_long(name), format!("--{name}"), value.clone())
                },
                ArgItem::Short(c) => (self.find_short(*c), format!("-{c}"), None),
            };

            let Some(spec) = spec else {
                if !self.permissive {
                    return Err(invalid(format!("unknown flag {display}")));
                }
                let key = display.trim_start_matches('-').to_string();
                let entry = parsed.flags.entry(key).or_default();
                entry.extend(inline);
                continue;
            };

            if spec.takes_value {
                let value = match inline {
                    Some(v) => v,
                    None => match items.next_if(|i| matches!(i, ArgItem::Value(_))) {
                        Some(ArgItem::Value(v)) => v.clone(),
                        _ => return Err(invalid(format!("missing value for {display}"))),
                    },
                };
                parsed.flags.entry(spec.long.clone()).or_default().push(value);
            } else {
                if inline.is_some() {
                    return Err(invalid(format!("{display} does not take a value")));
                }
                parsed.flags.entry(spec.long.clone()).or_default();
            }
        }

        for flag in self.flags.iter().filter(|f| f.required) {
            if !parsed.flags.contains_key(&flag.long) {
                return Err(invalid(format!("missing required flag --{}", flag.long)));
            }
        }

        let count = parsed.positionals.len();
        if count < self.min_positional {
            return Err(invalid(format!(
                "expected at least {} argument(s), got {count}",
                self.min_positional
            )));
        }
        if let Some(max) = self.max_positional
            && count > max
        {
            return Err(invalid(format!(
                "expected at most {max} argument(s), got {count}"
            )));
        }

        Ok(parsed)
    }
}

impl Default for ParamSpec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Parsed arguments
// ---------------------------------------------------------------------------

/// Arguments after validation against a [`ParamSpec`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    command: String,
    positionals: Vec<String>,
    flags: BTreeMap<String, Vec<String>>,
}

impl ParsedArgs {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            ..Self::default()
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }

    /// Whether the flag appeared at all (switch or option).
    pub fn has_flag(&self, long: &str) -> bool {
        self.flags.contains_key(long)
    }

    /// Last value given for an option flag.
    pub fn value(&self, long: &str) -> Option<&str> {
        self.flags
            .get(long)
            .and_then(|v| v.last())
            .map(String::as_str)
    }

    /// All values given for a repeated option flag.
    pub fn values(&self, long: &str) -> &[String] {
        self.flags.get(long).map(Vec::as_slice).unwrap_or(&[])
    }
}

//! Command-line flag tokenizer.
//!
//! Recognizes the single- and double-dash forms commonly used by Unix tools:
//!
//! - `-name=value` / `--name=value`
//! - `-name value` / `--name value`
//!
//! Every flag takes a string value. Parsing stops at the first token that is
//! not a flag (it and everything after it are returned as remaining
//! arguments), or right after a `--` terminator.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

/// Error type for flag parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagError {
    /// A flag that was never defined was supplied.
    #[error("flag provided but not defined: -{name}")]
    Unknown {
        /// Flag name, without leading dashes
        name: String,
    },

    /// A flag appeared last with no `=value` and no following token.
    #[error("flag needs an argument: -{name}")]
    MissingValue {
        /// Flag name, without leading dashes
        name: String,
    },

    /// A token such as `-=x` or `---x`.
    #[error("bad flag syntax: {token}")]
    BadSyntax {
        /// The offending token
        token: String,
    },

    /// The same flag name was defined twice.
    #[error("flag redefined: {name}")]
    Redefined {
        /// Flag name
        name: String,
    },
}

/// What to do when an undefined flag is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownFlags {
    /// Fail with [`FlagError::Unknown`].
    #[default]
    Error,
    /// Stop parsing silently. Flags before the unknown one are kept and the
    /// unknown token starts the remaining arguments.
    Stop,
}

/// The set of flag names accepted by [`FlagSet::parse`].
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    names: BTreeSet<String>,
}

/// Result of a successful parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    values: HashMap<String, String>,
    remaining: Vec<String>,
}

impl ParsedFlags {
    /// Returns the value supplied for `name`, if any. The last occurrence wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of distinct flags supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no flag was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arguments left after parsing stopped.
    #[must_use]
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }
}

impl FlagSet {
    /// Creates an empty flag set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a flag.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::Redefined`] if `name` is already defined.
    pub fn define(&mut self, name: impl Into<String>) -> Result<(), FlagError> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(FlagError::Redefined { name });
        }
        self.names.insert(name);
        Ok(())
    }

    /// Returns true if `name` is defined.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Parses `args` against the defined flags.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::BadSyntax`], [`FlagError::MissingValue`], or
    /// [`FlagError::Unknown`] (unless `unknown` is [`UnknownFlags::Stop`]).
    pub fn parse<S: AsRef<str>>(
        &self,
        args: &[S],
        unknown: UnknownFlags,
    ) -> Result<ParsedFlags, FlagError> {
        let mut parsed = ParsedFlags::default();
        let mut index = 0;

        while index < args.len() {
            let token = args[index].as_ref();
            if token.len() < 2 || !token.starts_with('-') {
                break;
            }
            if token == "--" {
                index += 1;
                break;
            }

            let body = token
                .strip_prefix("--")
                .unwrap_or_else(|| &token[1..]);
            if body.is_empty() || body.starts_with('-') || body.starts_with('=') {
                return Err(FlagError::BadSyntax {
                    token: token.to_string(),
                });
            }

            let (name, inline_value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (body, None),
            };

            if !self.contains(name) {
                match unknown {
                    UnknownFlags::Error => {
                        return Err(FlagError::Unknown {
                            name: name.to_string(),
                        });
                    }
                    UnknownFlags::Stop => break,
                }
            }

            let value = if let Some(value) = inline_value {
                index += 1;
                value.to_string()
            } else {
                let Some(next) = args.get(index + 1) else {
                    return Err(FlagError::MissingValue {
                        name: name.to_string(),
                    });
                };
                index += 2;
                next.as_ref().to_string()
            };

            parsed.values.insert(name.to_string(), value);
        }

        parsed.remaining = args[index..]
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        Ok(parsed)
    }
}

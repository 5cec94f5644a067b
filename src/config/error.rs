//! Error types for definition, resolution and validation.

use std::fmt;

use thiserror::Error;

use crate::flag::FlagError;
use crate::lock::LockCancelled;
use crate::param::LoadError;

/// Boxed error used for caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by a parameter's parse function.
pub type ParseError = BoxError;

/// Label of the implicit root command.
pub const ROOT_LABEL: &str = "";

/// Ordered subcommand labels identifying one node of the tree.
///
/// The first label is always the implicit root label (`""`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubCommandPath(Vec<String>);

impl SubCommandPath {
    /// The path of the root node.
    #[must_use]
    pub fn root() -> Self {
        Self(vec![ROOT_LABEL.to_string()])
    }

    /// Builds a path from the labels below the root.
    #[must_use]
    pub fn from_sub_commands<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        path.0.extend(labels.into_iter().map(Into::into));
        path
    }

    /// Returns a new path one level below this one.
    #[must_use]
    pub fn child(&self, label: &str) -> Self {
        let mut labels = self.0.clone();
        labels.push(label.to_string());
        Self(labels)
    }

    /// Returns the path one level up, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// All labels, root label included.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Labels below the root.
    #[must_use]
    pub fn sub_commands(&self) -> &[String] {
        &self.0[1..]
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.len() <= 1
    }

    /// Context prefix used in error messages; empty for the root.
    fn error_prefix(&self) -> String {
        if self.is_root() {
            String::new()
        } else {
            format!("on sub-commands {self}, ")
        }
    }
}

impl Default for SubCommandPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for SubCommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Node-scoped failure kinds.
#[derive(Debug, Error)]
pub enum CommandErrorKind {
    /// A subcommand label that the node does not declare.
    #[error("undefined command, declared: {declared:?}")]
    UndefinedCommand {
        /// Labels declared at the node where descent failed
        declared: Vec<String>,
    },

    /// The flag arguments could not be parsed.
    #[error("{0}")]
    FlagUnknown(#[source] FlagError),

    /// The tree itself is invalid (duplicate labels, duplicate flags...).
    #[error("{0}")]
    Definition(String),

    /// The node's completion callback failed.
    #[error("command callback failed: {0}")]
    Callback(#[source] BoxError),
}

/// Parameter-scoped failure kinds.
#[derive(Debug, Error)]
pub enum ParamErrorKind {
    /// Mandatory parameter resolved to an empty value.
    #[error("mandatory value")]
    MandatoryValue,

    /// Value outside the declared enum set.
    #[error("got value {value:?}, expected one of {expected:?}")]
    NotInEnum {
        /// The resolved value
        value: String,
        /// Allowed values
        expected: Vec<String>,
    },

    /// Both this parameter and `other` hold a value.
    #[error("exclusive with param {other:?}")]
    Exclusive {
        /// Name of the conflicting parameter
        other: String,
    },

    /// The parse function rejected the value.
    #[error("parse error: {0}")]
    Parse(#[source] ParseError),

    /// The loader failed to fetch a value.
    #[error("loader fetch failed: {0}")]
    LoaderFetch(#[source] LoadError),

    /// The parameter definition is invalid.
    #[error("{0}")]
    Definition(String),
}

/// Failure attributed to one parameter.
#[derive(Debug, Error)]
#[error("{}param {name:?}: {kind}", path.error_prefix())]
pub struct ParamError {
    /// Path of the node owning the parameter
    pub path: SubCommandPath,
    /// Parameter name
    pub name: String,
    /// What went wrong
    #[source]
    pub kind: ParamErrorKind,
}

impl ParamError {
    /// Creates a parameter error.
    #[must_use]
    pub fn new(path: SubCommandPath, name: impl Into<String>, kind: ParamErrorKind) -> Self {
        Self {
            path,
            name: name.into(),
            kind,
        }
    }
}

/// All exclusivity conflicts found by one validation pass.
#[derive(Debug, Default)]
pub struct AggregatedError {
    /// Individual conflicts, in detection order
    pub errors: Vec<ParamError>,
}

impl AggregatedError {
    /// Returns true if no conflict was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded conflicts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

impl fmt::Display for AggregatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregatedError {}

/// Error type for configuration definition and resolution.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failure scoped to a node of the tree.
    #[error("{}{kind}", path.error_prefix())]
    Command {
        /// Path of the node (for undefined commands, including the unknown label)
        path: SubCommandPath,
        /// What went wrong
        #[source]
        kind: CommandErrorKind,
    },

    /// Failure scoped to one parameter.
    #[error(transparent)]
    Param(#[from] ParamError),

    /// Several parameter failures reported together.
    #[error(transparent)]
    Aggregated(#[from] AggregatedError),

    /// Another error enriched with usage text.
    #[error("{error}\nUsage:\n{usage}")]
    WithUsage {
        /// The original error
        #[source]
        error: Box<ConfigError>,
        /// Rendered usage of the node or parameter the error refers to
        usage: String,
    },

    /// Waiting for the shared lock was cancelled.
    #[error("resolution cancelled")]
    Cancelled,
}

impl From<LockCancelled> for ConfigError {
    fn from(_: LockCancelled) -> Self {
        Self::Cancelled
    }
}

impl ConfigError {
    /// Creates a node-scoped error.
    #[must_use]
    pub const fn command(path: SubCommandPath, kind: CommandErrorKind) -> Self {
        Self::Command { path, kind }
    }

    /// Creates a parameter-scoped error.
    #[must_use]
    pub fn param(path: SubCommandPath, name: impl Into<String>, kind: ParamErrorKind) -> Self {
        Self::Param(ParamError::new(path, name, kind))
    }

    /// Returns the error without any usage wrapper.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::WithUsage { error, .. } => error.root(),
            other => other,
        }
    }

    /// Returns the usage text, if this error carries one.
    #[must_use]
    pub fn usage(&self) -> Option<&str> {
        match self {
            Self::WithUsage { usage, .. } => Some(usage),
            _ => None,
        }
    }

    /// Returns the parameter error, looking through usage wrappers.
    #[must_use]
    pub fn as_param(&self) -> Option<&ParamError> {
        match self.root() {
            Self::Param(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the aggregated errors, looking through usage wrappers.
    #[must_use]
    pub fn as_aggregated(&self) -> Option<&AggregatedError> {
        match self.root() {
            Self::Aggregated(error) => Some(error),
            _ => None,
        }
    }

    /// Returns true if resolution was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled)
    }
}

//! Typed field values and the store they are parsed into.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::config::ParseError;
use crate::duration::{DurationError, format_duration, parse_duration};

/// Error type for converting a string into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Not one of the accepted boolean spellings.
    #[error("invalid bool {value:?}")]
    InvalidBool {
        /// The rejected input
        value: String,
    },

    /// Not a number of the expected kind, or out of range.
    #[error("invalid {kind} {value:?}")]
    InvalidNumber {
        /// The rejected input
        value: String,
        /// Expected kind, e.g. `int`
        kind: FieldKind,
    },

    /// Not a valid duration.
    #[error(transparent)]
    Duration(#[from] DurationError),
}

/// The type a schema field is parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Raw string.
    #[default]
    String,
    /// `true`/`false` (also `1`, `t`, `TRUE`, `0`, `f`, `False`...).
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// Unsigned 64-bit integer.
    Uint,
    /// 64-bit float.
    Float,
    /// Duration such as `1h30m`.
    Duration,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Float => "float",
            Self::Duration => "duration",
        };
        f.write_str(name)
    }
}

impl FieldKind {
    /// Converts `raw` into a value of this kind.
    ///
    /// # Errors
    ///
    /// Returns a [`ValueError`] if `raw` is not valid for this kind.
    pub fn parse(self, raw: &str) -> Result<FieldValue, ValueError> {
        let invalid_number = || ValueError::InvalidNumber {
            value: raw.to_string(),
            kind: self,
        };
        Ok(match self {
            Self::String => FieldValue::String(raw.to_string()),
            Self::Bool => FieldValue::Bool(parse_bool(raw)?),
            Self::Int => FieldValue::Int(raw.parse().map_err(|_| invalid_number())?),
            Self::Uint => FieldValue::Uint(raw.parse().map_err(|_| invalid_number())?),
            Self::Float => FieldValue::Float(raw.parse().map_err(|_| invalid_number())?),
            Self::Duration => FieldValue::Duration(parse_duration(raw)?),
        })
    }
}

/// Parses the boolean spellings accepted on command lines.
///
/// # Errors
///
/// Returns [`ValueError::InvalidBool`] for anything else.
pub fn parse_bool(raw: &str) -> Result<bool, ValueError> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ValueError::InvalidBool {
            value: raw.to_string(),
        }),
    }
}

/// A parsed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// String value
    String(String),
    /// Boolean value
    Bool(bool),
    /// Signed integer value
    Int(i64),
    /// Unsigned integer value
    Uint(u64),
    /// Float value
    Float(f64),
    /// Duration value, serialized in compact form (`1m30s`)
    Duration(Duration),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::String(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Uint(u) => serializer.serialize_u64(*u),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Duration(d) => serializer.serialize_str(&format_duration(*d)),
        }
    }
}

/// Hook for field types not covered by [`FieldKind`].
///
/// Mirrors `FromStr` but writes into caller-owned storage.
pub trait SetFromStr: Send + Sync {
    /// Parses and stores `value`.
    ///
    /// # Errors
    ///
    /// Returns the parse failure.
    fn set(&self, value: &str) -> Result<(), ParseError>;
}

/// Shared map of parsed values, keyed by field name.
///
/// Cloning is cheap and yields a handle to the same map.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: Arc<Mutex<BTreeMap<String, FieldValue>>>,
}

impl ValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, BTreeMap<String, FieldValue>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the value stored for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.guard().get(field).cloned()
    }

    /// Stores `value` for `field`, replacing any previous value.
    pub fn insert(&self, field: impl Into<String>, value: FieldValue) {
        self.guard().insert(field.into(), value);
    }

    /// Copies every stored value.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, FieldValue> {
        self.guard().clone()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

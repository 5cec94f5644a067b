//! Environment variable lookup.
//!
//! Resolution reads environment variables through the [`EnvSource`] trait so
//! that tests can inject a fixed set of variables instead of mutating the
//! process environment.

use std::collections::HashMap;

/// Abstraction over an environment variable store.
///
/// # Example
///
/// ```
/// use paramtree::env::{EnvSource, MapEnv};
///
/// let env = MapEnv::from_pairs([("CITY", "Toronto")]);
/// assert_eq!(env.get("CITY").as_deref(), Some("Toronto"));
/// assert_eq!(env.get("AGE"), None);
/// ```
pub trait EnvSource: Send + Sync {
    /// Returns the value of `key`, or `None` if it is not set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Production source reading the process environment.
///
/// Values that are not valid unicode are treated as unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory source backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source from key/value pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Adds or replaces a variable.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

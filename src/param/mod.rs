//! Parameter definitions.
//!
//! A [`Param`] names one configuration value, how to parse it into caller
//! storage, and which sources may supply it:
//!
//! - a default value
//! - an optional [`Loader`] (fetched once, optionally refreshed)
//! - an environment variable (named after the parameter unless overridden)
//! - a command-line flag (named after the parameter unless overridden)
//!
//! Parameters are built with [`ParamBuilder`] and are immutable afterwards.

mod loader;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub use loader::{FileLoader, FnLoader, LoadError, LoadFuture, Loader, LoaderSpec, loader_fn};

use crate::config::{ConfigError, ParamErrorKind, ParseError, SubCommandPath};
use crate::duration::parse_duration;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Parse function applied to the resolved value.
pub type ParseFn = Arc<dyn Fn(&str) -> Result<(), ParseError> + Send + Sync>;

/// Whether a flag may supply the value, and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSource {
    enabled: bool,
    name: Option<String>,
}

impl Default for FlagSource {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
        }
    }
}

impl FlagSource {
    /// Effective flag name, or `None` when the flag is disabled.
    #[must_use]
    pub fn resolved_name<'a>(&'a self, param_name: &'a str) -> Option<&'a str> {
        self.enabled
            .then(|| self.name.as_deref().unwrap_or(param_name))
    }
}

/// Whether an environment variable may supply the value, and under which name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVarSource {
    enabled: bool,
    name: Option<String>,
}

impl Default for EnvVarSource {
    fn default() -> Self {
        Self {
            enabled: true,
            name: None,
        }
    }
}

impl EnvVarSource {
    /// Effective variable name, or `None` when the variable is disabled.
    #[must_use]
    pub fn resolved_name<'a>(&'a self, param_name: &'a str) -> Option<&'a str> {
        self.enabled
            .then(|| self.name.as_deref().unwrap_or(param_name))
    }
}

/// An immutable parameter definition.
///
/// Cloning is cheap: the parse function and loader are shared.
#[derive(Clone)]
pub struct Param {
    name: String,
    parse: ParseFn,
    flag: FlagSource,
    env_var: EnvVarSource,
    loader: Option<LoaderSpec>,
    mandatory: bool,
    default: String,
    description: Option<String>,
    examples: Vec<String>,
    enum_values: Vec<String>,
    exclusive: Vec<String>,
    sub_command_local: bool,
}

impl Param {
    /// Starts building a parameter with a raw string parse function.
    ///
    /// # Example
    ///
    /// ```
    /// use paramtree::param::Param;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let city = Arc::new(Mutex::new(String::new()));
    /// let target = Arc::clone(&city);
    /// let param = Param::builder("City", move |value| {
    ///     *target.lock().unwrap() = value.to_string();
    ///     Ok(())
    /// })
    /// .with_default("Paris")
    /// .build()
    /// .unwrap();
    ///
    /// assert_eq!(param.name(), "City");
    /// ```
    pub fn builder<F>(name: impl Into<String>, parse: F) -> ParamBuilder
    where
        F: Fn(&str) -> Result<(), ParseError> + Send + Sync + 'static,
    {
        ParamBuilder::new(name.into(), Arc::new(parse))
    }

    /// Starts building a parameter whose value is converted with [`FromStr`]
    /// before being handed to `set`.
    ///
    /// An empty value leaves the target untouched.
    pub fn parsed<T, F>(name: impl Into<String>, set: F) -> ParamBuilder
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
        F: Fn(T) -> Result<(), ParseError> + Send + Sync + 'static,
    {
        Self::builder(name, move |value| {
            if value.is_empty() {
                return Ok(());
            }
            set(value.parse::<T>()?)
        })
    }

    /// Starts building a duration parameter (`1h30m`, `250ms`...).
    ///
    /// An empty value leaves the target untouched.
    pub fn duration<F>(name: impl Into<String>, set: F) -> ParamBuilder
    where
        F: Fn(Duration) -> Result<(), ParseError> + Send + Sync + 'static,
    {
        Self::builder(name, move |value| {
            if value.is_empty() {
                return Ok(());
            }
            set(parse_duration(value)?)
        })
    }

    /// Parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective flag name, `None` if disabled.
    #[must_use]
    pub fn flag_name(&self) -> Option<&str> {
        self.flag.resolved_name(&self.name)
    }

    /// Effective environment variable name, `None` if disabled.
    #[must_use]
    pub fn env_var_name(&self) -> Option<&str> {
        self.env_var.resolved_name(&self.name)
    }

    /// The loader, if one is attached.
    #[must_use]
    pub const fn loader(&self) -> Option<&LoaderSpec> {
        self.loader.as_ref()
    }

    /// Returns true if an empty value is an error.
    #[must_use]
    pub const fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Default value (empty when none).
    #[must_use]
    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Free-text description, shown in usage.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Example values, shown in usage.
    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Allowed values; empty means unconstrained.
    #[must_use]
    pub fn enum_values(&self) -> &[String] {
        &self.enum_values
    }

    /// Names of parameters that must not hold a value at the same time.
    #[must_use]
    pub fn exclusive(&self) -> &[String] {
        &self.exclusive
    }

    /// Returns true if the parameter is only active on its own node, not on
    /// the node's subcommands.
    #[must_use]
    pub const fn is_sub_command_local(&self) -> bool {
        self.sub_command_local
    }

    /// Returns true if `value` is allowed by the enum constraint.
    #[must_use]
    pub fn accepts(&self, value: &str) -> bool {
        self.enum_values.is_empty() || self.enum_values.iter().any(|v| v == value)
    }

    /// Invokes the parse function. Callers must hold the shared lock.
    pub(crate) fn apply(&self, value: &str) -> Result<(), ParseError> {
        (self.parse)(value)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("flag", &self.flag)
            .field("env_var", &self.env_var)
            .field("loader", &self.loader)
            .field("mandatory", &self.mandatory)
            .field("default", &self.default)
            .field("enum_values", &self.enum_values)
            .field("exclusive", &self.exclusive)
            .field("sub_command_local", &self.sub_command_local)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Param`].
#[must_use]
pub struct ParamBuilder {
    param: Param,
    refresh: Option<Duration>,
}

impl fmt::Debug for ParamBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamBuilder")
            .field("param", &self.param)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl ParamBuilder {
    fn new(name: String, parse: ParseFn) -> Self {
        Self {
            param: Param {
                name,
                parse,
                flag: FlagSource::default(),
                env_var: EnvVarSource::default(),
                loader: None,
                mandatory: false,
                default: String::new(),
                description: None,
                examples: Vec::new(),
                enum_values: Vec::new(),
                exclusive: Vec::new(),
                sub_command_local: false,
            },
            refresh: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.param.default = value.into();
        self
    }

    /// Sets the description shown in usage.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.param.description = Some(description.into());
        self
    }

    /// Sets the example values shown in usage.
    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the value to the given set.
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Declares parameters that must not hold a value together with this one.
    pub fn with_exclusive<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param.exclusive = names.into_iter().map(Into::into).collect();
        self
    }

    /// Makes an empty resolved value an error.
    pub const fn with_mandatory(mut self, mandatory: bool) -> Self {
        self.param.mandatory = mandatory;
        self
    }

    /// Limits the parameter to its own node (not inherited by subcommands).
    pub const fn with_sub_command_local(mut self, local: bool) -> Self {
        self.param.sub_command_local = local;
        self
    }

    /// Overrides the flag name.
    pub fn with_flag_name(mut self, name: impl Into<String>) -> Self {
        self.param.flag = FlagSource {
            enabled: true,
            name: Some(name.into()),
        };
        self
    }

    /// Disables the flag source.
    pub fn without_flag(mut self) -> Self {
        self.param.flag = FlagSource {
            enabled: false,
            name: None,
        };
        self
    }

    /// Overrides the environment variable name.
    pub fn with_env_var_name(mut self, name: impl Into<String>) -> Self {
        self.param.env_var = EnvVarSource {
            enabled: true,
            name: Some(name.into()),
        };
        self
    }

    /// Disables the environment variable source.
    pub fn without_env_var(mut self) -> Self {
        self.param.env_var = EnvVarSource {
            enabled: false,
            name: None,
        };
        self
    }

    /// Attaches a loader, fetched once during resolution.
    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.param.loader = Some(LoaderSpec::new(loader));
        self
    }

    /// Attaches a prepared loader spec (loader plus interval).
    pub fn with_loader_spec(mut self, spec: LoaderSpec) -> Self {
        self.param.loader = Some(spec);
        self
    }

    /// Polls the loader again every `interval` after resolution.
    ///
    /// Requires a loader; a zero interval disables polling.
    pub const fn with_refresh(mut self, interval: Duration) -> Self {
        self.refresh = Some(interval);
        self
    }

    /// Validates and returns the parameter.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError::Param`] with a definition error if the name or
    /// an overridden flag/environment variable name is empty, or if a refresh
    /// interval was set without a loader.
    pub fn build(mut self) -> Result<Param, ConfigError> {
        let name = self.param.name.clone();
        let definition = |message: &str| {
            ConfigError::param(
                SubCommandPath::root(),
                name.clone(),
                ParamErrorKind::Definition(message.to_string()),
            )
        };

        if name.is_empty() {
            return Err(definition("param name must not be empty"));
        }
        if self.param.flag.name.as_deref() == Some("") {
            return Err(definition("flag name must not be empty"));
        }
        if self.param.env_var.name.as_deref() == Some("") {
            return Err(definition("env var name must not be empty"));
        }

        if let Some(interval) = self.refresh {
            match self.param.loader.take() {
                Some(spec) => self.param.loader = Some(spec.with_interval(interval)),
                None => return Err(definition("refresh interval set without a loader")),
            }
        }

        Ok(self.param)
    }
}

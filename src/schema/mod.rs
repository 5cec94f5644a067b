//! Parameter definitions from a field schema.
//!
//! Describes configuration fields declaratively (a name, a [`FieldKind`] and
//! a map of tags) and turns each one into a [`Param`] whose parse function
//! stores the typed value in a shared [`ValueStore`].
//!
//! # Tags
//!
//! | Tag | Effect |
//! |---|---|
//! | `flag` | flag name, `-` disables the flag |
//! | `envVar` | environment variable name, `-` disables it |
//! | `mandatory` | `true`/`false` |
//! | `desc` | description shown in usage |
//! | `default` | default value |
//! | `examples` | `;`-separated examples shown in usage |
//! | `exclusiveTags` | `;`-separated names of mutually exclusive fields |
//! | `enumValues` | `;`-separated allowed values |
//!
//! An empty string is never parsed: the stored value is left untouched.

mod value;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use value::{FieldKind, FieldValue, SetFromStr, ValueError, ValueStore, parse_bool};

use crate::config::{ConfigError, ParamErrorKind, SubCommandPath};
use crate::param::{Param, ParamBuilder};

/// Tag names recognized on a field.
pub mod tag {
    /// Flag name, or `-` to disable.
    pub const FLAG: &str = "flag";
    /// Environment variable name, or `-` to disable.
    pub const ENV_VAR: &str = "envVar";
    /// `true` or `false`.
    pub const MANDATORY: &str = "mandatory";
    /// Free-text description.
    pub const DESC: &str = "desc";
    /// Default value.
    pub const DEFAULT: &str = "default";
    /// Example values.
    pub const EXAMPLES: &str = "examples";
    /// Mutually exclusive field names.
    pub const EXCLUSIVE_TAGS: &str = "exclusiveTags";
    /// Allowed values.
    pub const ENUM_VALUES: &str = "enumValues";

    /// Every recognized tag.
    pub const ALL: [&str; 8] = [
        FLAG,
        ENV_VAR,
        MANDATORY,
        DESC,
        DEFAULT,
        EXAMPLES,
        EXCLUSIVE_TAGS,
        ENUM_VALUES,
    ];
}

/// Separator for list-valued tags.
pub const LIST_SEPARATOR: char = ';';

/// Tag value disabling a flag or environment variable.
pub const DISABLED: &str = "-";

/// Declarative description of one configuration field.
#[derive(Clone)]
pub struct FieldSchema {
    name: String,
    kind: FieldKind,
    tags: BTreeMap<String, String>,
    setter: Option<Arc<dyn SetFromStr>>,
}

impl FieldSchema {
    /// Creates a field with no tags.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            tags: BTreeMap::new(),
            setter: None,
        }
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Delegates parsing to a custom setter instead of [`FieldKind`].
    ///
    /// The raw string is still recorded in the store.
    #[must_use]
    pub fn with_setter(mut self, setter: impl SetFromStr + 'static) -> Self {
        self.setter = Some(Arc::new(setter));
        self
    }

    /// Field name, also the key in the [`ValueStore`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value kind.
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Value of a tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .field("has_setter", &self.setter.is_some())
            .finish()
    }
}

fn split_list(raw: &str) -> Vec<&str> {
    raw.split(LIST_SEPARATOR).collect()
}

/// Builds the parameter for one field.
///
/// `prefix` is prepended to the parameter name, to explicit flag and
/// environment variable names, and to exclusive field names. The value is
/// stored under the unprefixed field name.
///
/// The returned builder can be extended (for instance with a loader) before
/// calling [`ParamBuilder::build`].
///
/// # Errors
///
/// Returns a definition error for an unknown tag or a non-boolean
/// `mandatory` tag.
pub fn param_from_field(
    field: &FieldSchema,
    prefix: &str,
    store: &ValueStore,
) -> Result<ParamBuilder, ConfigError> {
    let definition = |message: String| {
        ConfigError::param(
            SubCommandPath::root(),
            format!("{prefix}{}", field.name),
            ParamErrorKind::Definition(message),
        )
    };

    if let Some(unknown) = field.tags.keys().find(|k| !tag::ALL.contains(&k.as_str())) {
        return Err(definition(format!("unknown tag {unknown:?}")));
    }

    let key = field.name.clone();
    let kind = field.kind;
    let setter = field.setter.clone();
    let target = store.clone();
    let mut builder = Param::builder(format!("{prefix}{}", field.name), move |raw| {
        if raw.is_empty() {
            return Ok(());
        }
        let value = match &setter {
            Some(setter) => {
                setter.set(raw)?;
                FieldValue::String(raw.to_string())
            }
            None => kind.parse(raw)?,
        };
        target.insert(key.clone(), value);
        Ok(())
    });

    match field.tag(tag::FLAG) {
        Some(DISABLED) => builder = builder.without_flag(),
        Some(name) if !name.is_empty() => builder = builder.with_flag_name(format!("{prefix}{name}")),
        _ => {}
    }
    match field.tag(tag::ENV_VAR) {
        Some(DISABLED) => builder = builder.without_env_var(),
        Some(name) if !name.is_empty() => {
            builder = builder.with_env_var_name(format!("{prefix}{name}"));
        }
        _ => {}
    }
    if let Some(raw) = field.tag(tag::MANDATORY) {
        let mandatory = parse_bool(raw)
            .map_err(|_| definition(format!("tag {:?} must be a boolean", tag::MANDATORY)))?;
        builder = builder.with_mandatory(mandatory);
    }
    if let Some(desc) = field.tag(tag::DESC) {
        builder = builder.with_description(desc);
    }
    if let Some(default) = field.tag(tag::DEFAULT) {
        builder = builder.with_default(default);
    }
    if let Some(raw) = field.tag(tag::EXAMPLES) {
        builder = builder.with_examples(split_list(raw));
    }
    if let Some(raw) = field.tag(tag::EXCLUSIVE_TAGS) {
        builder = builder.with_exclusive(split_list(raw).into_iter().map(|n| format!("{prefix}{n}")));
    }
    if let Some(raw) = field.tag(tag::ENUM_VALUES) {
        builder = builder.with_enum_values(split_list(raw));
    }

    Ok(builder)
}

/// Builds the parameters for every field, in order.
///
/// # Errors
///
/// Returns the first definition error.
pub fn params_from_schema(
    fields: &[FieldSchema],
    prefix: &str,
    store: &ValueStore,
) -> Result<Vec<Param>, ConfigError> {
    fields
        .iter()
        .map(|field| param_from_field(field, prefix, store)?.build())
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

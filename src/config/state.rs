//! Per-parameter precedence resolution.

use tokio_util::sync::CancellationToken;

use crate::env::EnvSource;
use crate::flag::ParsedFlags;
use crate::lock::ConfigLock;
use crate::param::Param;

use super::error::{ConfigError, ParamErrorKind, SubCommandPath};

/// Outcome of resolving one parameter during a single `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamState {
    /// Path of the node owning the parameter
    pub path: SubCommandPath,
    /// Parameter name
    pub name: String,
    /// The value handed to the parse function
    pub value: String,
    /// True if an environment variable or a flag supplied the value
    pub has_env_var_or_flag: bool,
    /// True if the value is non-empty
    pub has_value: bool,
}

/// Sources consulted for every parameter of one resolution.
pub(crate) struct Sources<'a> {
    pub env: &'a dyn EnvSource,
    pub flags: &'a ParsedFlags,
    pub lock: &'a ConfigLock,
    pub cancel: &'a CancellationToken,
}

/// Resolves `param` from its sources, validates it and applies the parse
/// function under the lock.
///
/// Precedence, lowest first: default, loader, environment variable, flag.
/// The loader is only consulted when neither an environment variable nor a
/// flag supplied a non-empty value.
pub(crate) async fn resolve_param(
    param: &Param,
    path: &SubCommandPath,
    sources: &Sources<'_>,
) -> Result<ParamState, ConfigError> {
    let name = param.name();
    let mut value = param.default_value().to_string();
    let mut has_env_var_or_flag = false;

    if let Some(var) = param.env_var_name() {
        match sources.env.get(var) {
            Some(env_value) if !env_value.is_empty() => {
                tracing::debug!(param = name, env_var = var, "Value found in environment");
                value = env_value;
                has_env_var_or_flag = true;
            }
            _ => tracing::debug!(param = name, env_var = var, "No value in environment"),
        }
    }

    if let Some(flag) = param.flag_name() {
        match sources.flags.get(flag) {
            Some(flag_value) if !flag_value.is_empty() => {
                tracing::debug!(param = name, flag, "Value found in flags");
                value = flag_value.to_string();
                has_env_var_or_flag = true;
            }
            _ => tracing::debug!(param = name, flag, "No value in flags"),
        }
    }

    if let Some(loader) = param.loader() {
        if has_env_var_or_flag {
            tracing::debug!(param = name, "Loader skipped, overridden by env var or flag");
        } else {
            let loaded = loader.fetch(sources.cancel).await.map_err(|e| {
                ConfigError::param(path.clone(), name, ParamErrorKind::LoaderFetch(e))
            })?;
            if loaded.is_empty() {
                tracing::debug!(param = name, "Loader returned no value");
            } else {
                tracing::debug!(param = name, "Value found by loader");
                value = loaded;
            }
        }
    }

    validate_value(param, path, &value)?;

    let has_value = !value.is_empty();
    apply_locked(param, path, &value, sources.lock, sources.cancel).await?;

    Ok(ParamState {
        path: path.clone(),
        name: name.to_string(),
        value,
        has_env_var_or_flag,
        has_value,
    })
}

/// Checks the mandatory and enum constraints.
pub(crate) fn validate_value(
    param: &Param,
    path: &SubCommandPath,
    value: &str,
) -> Result<(), ConfigError> {
    if param.is_mandatory() && value.is_empty() {
        return Err(ConfigError::param(
            path.clone(),
            param.name(),
            ParamErrorKind::MandatoryValue,
        ));
    }
    if !param.accepts(value) {
        return Err(ConfigError::param(
            path.clone(),
            param.name(),
            ParamErrorKind::NotInEnum {
                value: value.to_string(),
                expected: param.enum_values().to_vec(),
            },
        ));
    }
    Ok(())
}

/// Applies the parse function while holding the shared lock.
///
/// The wait for the lock ends early with [`ConfigError::Cancelled`] if
/// `cancel` fires.
pub(crate) async fn apply_locked(
    param: &Param,
    path: &SubCommandPath,
    value: &str,
    lock: &ConfigLock,
    cancel: &CancellationToken,
) -> Result<(), ConfigError> {
    let _guard = lock.lock_with_cancel(cancel).await?;
    param
        .apply(value)
        .map_err(|e| ConfigError::param(path.clone(), param.name(), ParamErrorKind::Parse(e)))
}

//! Resolution driver: subcommand descent, flag parsing, per-parameter
//! resolution, exclusivity validation and refresh scheduling.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;

use crate::flag::{FlagSet, UnknownFlags};
use crate::param::Param;
use crate::sync::{RefreshTask, Scheduler};

use super::error::{
    AggregatedError, CommandErrorKind, ConfigError, ParamError, ParamErrorKind, SubCommandPath,
};
use super::node::{Callback, ConfigNode};
use super::state::{ParamState, Sources, resolve_param};

/// Outcome of a successful [`ConfigNode::init`].
#[derive(Debug)]
pub struct Resolved {
    /// Subcommand path that was selected by the arguments
    pub path: SubCommandPath,
    /// Resolution state of every active parameter, in resolution order
    pub states: Vec<ParamState>,
    /// Background refresh tasks started for this resolution
    pub scheduler: Scheduler,
}

impl Resolved {
    /// Resolved value of an active parameter.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.state(name).map(|s| s.value.as_str())
    }

    /// Resolution state of an active parameter.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<&ParamState> {
        self.states.iter().find(|s| s.name == name)
    }
}

/// A parameter selected for resolution, with the path of its owning node.
#[derive(Debug)]
pub struct ActiveParam<'a> {
    /// The parameter definition
    pub param: &'a Param,
    /// Path of the node declaring it
    pub path: SubCommandPath,
}

/// Everything a resolution needs from the tree for one subcommand path.
pub struct ActiveSet<'a> {
    /// Full path that was selected
    pub path: SubCommandPath,
    /// Active parameters, root first, in declaration order
    pub params: Vec<ActiveParam<'a>>,
    /// Callback of the deepest node
    pub callback: Option<&'a Callback>,
}

impl std::fmt::Debug for ActiveSet<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveSet")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Splits the arguments into leading subcommand labels and flag arguments.
///
/// Labels are the tokens before the first token starting with `-`. When
/// `ignore_sub_commands` is set, those tokens are skipped and no label is
/// returned.
#[must_use]
pub fn split_sub_commands<S: AsRef<str>>(
    args: &[S],
    ignore_sub_commands: bool,
) -> (Vec<String>, &[S]) {
    let split = args
        .iter()
        .position(|a| a.as_ref().starts_with('-'))
        .unwrap_or(args.len());

    let labels = if ignore_sub_commands {
        Vec::new()
    } else {
        args[..split].iter().map(|a| a.as_ref().to_string()).collect()
    };
    (labels, &args[split..])
}

impl ConfigNode {
    /// Walks the tree along `labels` and collects the active parameters.
    ///
    /// Parameters marked sub-command local only stay active on the last node
    /// of the path.
    ///
    /// # Errors
    ///
    /// Returns an undefined command error for a label the current node does
    /// not declare, and a definition error when two active parameters share a
    /// name.
    pub fn collect_active<'a>(&'a self, labels: &[String]) -> Result<ActiveSet<'a>, ConfigError> {
        let mut nodes = vec![(self, SubCommandPath::root())];
        for label in labels {
            let (node, path) = &nodes[nodes.len() - 1];
            let (node, path) = (*node, path.clone());
            let Some(child) = node.sub_command(label) else {
                return Err(ConfigError::command(
                    path.child(label),
                    CommandErrorKind::UndefinedCommand {
                        declared: node.sub_command_labels().map(str::to_string).collect(),
                    },
                ));
            };
            nodes.push((child, path.child(label)));
        }

        let last = nodes.len() - 1;
        let mut params = Vec::new();
        let mut seen = HashSet::new();
        for (depth, (node, path)) in nodes.iter().enumerate() {
            for param in &node.params {
                if param.is_sub_command_local() && depth != last {
                    continue;
                }
                if !seen.insert(param.name()) {
                    return Err(ConfigError::param(
                        path.clone(),
                        param.name(),
                        ParamErrorKind::Definition(
                            "param already declared by a parent command".to_string(),
                        ),
                    ));
                }
                params.push(ActiveParam {
                    param,
                    path: path.clone(),
                });
            }
        }

        let (deepest, path) = &nodes[last];
        Ok(ActiveSet {
            path: path.clone(),
            params,
            callback: deepest.callback.as_ref(),
        })
    }

    /// Resolves every active parameter for `args` and starts the background
    /// refresh tasks.
    ///
    /// Must be called on the root node: its lock, environment source, error
    /// handler and flag settings apply to the whole tree. `cancel` bounds
    /// lock waits during resolution and stops the refresh tasks.
    ///
    /// # Errors
    ///
    /// Returns the first resolution failure, or every exclusivity conflict at
    /// once. Errors that can be attributed to a parameter or a node are
    /// wrapped in [`ConfigError::WithUsage`].
    pub async fn init<S: AsRef<str>>(
        &self,
        args: &[S],
        cancel: &CancellationToken,
    ) -> Result<Resolved, ConfigError> {
        self.resolve(args, cancel)
            .await
            .map_err(|e| self.with_usage(e))
    }

    /// [`ConfigNode::init`] with the process arguments (program name
    /// excluded).
    ///
    /// # Errors
    ///
    /// See [`ConfigNode::init`].
    pub async fn init_from_env_args(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Resolved, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        self.init(&args, cancel).await
    }

    async fn resolve<S: AsRef<str>>(
        &self,
        args: &[S],
        cancel: &CancellationToken,
    ) -> Result<Resolved, ConfigError> {
        let (labels, flag_args) = split_sub_commands(args, self.ignore_sub_commands);
        let active = self.collect_active(&labels)?;
        tracing::debug!(path = %active.path, params = active.params.len(), "Resolving");

        let flag_set = build_flag_set(&active)?;
        let unknown = if self.ignore_unknown_flags {
            UnknownFlags::Stop
        } else {
            UnknownFlags::Error
        };
        let flags = flag_set.parse(flag_args, unknown).map_err(|e| {
            tracing::warn!(path = %active.path, "Invalid flags: {e}");
            ConfigError::command(active.path.clone(), CommandErrorKind::FlagUnknown(e))
        })?;

        let sources = Sources {
            env: self.env.as_ref(),
            flags: &flags,
            lock: &self.lock,
            cancel,
        };
        let mut states = Vec::with_capacity(active.params.len());
        for entry in &active.params {
            states.push(resolve_param(entry.param, &entry.path, &sources).await?);
        }

        check_exclusivity(&active, &states)?;

        let refresh_cancel = cancel.child_token();
        let mut scheduler = Scheduler::new();
        for (entry, state) in active.params.iter().zip(&states) {
            if state.has_env_var_or_flag {
                if entry.param.loader().is_some_and(|l| l.is_periodic()) {
                    tracing::debug!(param = %state.name, "Refresh not started, value overridden");
                }
                continue;
            }
            if let Some(task) =
                RefreshTask::new(entry.param.clone(), entry.path.clone(), state.value.clone())
            {
                scheduler.spawn(task, &self.lock, &self.load_error_handler, &refresh_cancel);
            }
        }

        if let Some(callback) = active.callback {
            if let Err(e) = callback() {
                // A failed init leaves nothing running.
                refresh_cancel.cancel();
                scheduler.join().await;
                return Err(ConfigError::command(
                    active.path.clone(),
                    CommandErrorKind::Callback(e),
                ));
            }
        }

        Ok(Resolved {
            path: active.path,
            states,
            scheduler,
        })
    }
}

/// Registers the flag of every active parameter.
fn build_flag_set(active: &ActiveSet<'_>) -> Result<FlagSet, ConfigError> {
    let mut flag_set = FlagSet::new();
    for entry in &active.params {
        if let Some(flag) = entry.param.flag_name() {
            flag_set.define(flag).map_err(|e| {
                ConfigError::command(
                    active.path.clone(),
                    CommandErrorKind::Definition(format!(
                        "param {:?}: {e}",
                        entry.param.name()
                    )),
                )
            })?;
        }
    }
    Ok(flag_set)
}

/// Reports every pair of mutually exclusive parameters that both hold a
/// value. Each side of a conflict is reported once.
fn check_exclusivity(active: &ActiveSet<'_>, states: &[ParamState]) -> Result<(), ConfigError> {
    let by_name: HashMap<&str, (&ActiveParam<'_>, &ParamState)> = active
        .params
        .iter()
        .zip(states)
        .map(|(entry, state)| (entry.param.name(), (entry, state)))
        .collect();

    let mut conflicts: Vec<(&str, &str)> = Vec::new();
    for (entry, state) in active.params.iter().zip(states) {
        if !state.has_value {
            continue;
        }
        for other in entry.param.exclusive() {
            let Some((_, other_state)) = by_name.get(other.as_str()) else {
                continue;
            };
            if other == entry.param.name() || !other_state.has_value {
                continue;
            }
            for pair in [
                (entry.param.name(), other.as_str()),
                (other.as_str(), entry.param.name()),
            ] {
                if !conflicts.contains(&pair) {
                    conflicts.push(pair);
                }
            }
        }
    }

    if conflicts.is_empty() {
        return Ok(());
    }

    let errors = conflicts
        .into_iter()
        .map(|(name, other)| {
            let path = by_name
                .get(name)
                .map_or_else(SubCommandPath::root, |(entry, _)| entry.path.clone());
            ParamError::new(
                path,
                name,
                ParamErrorKind::Exclusive {
                    other: other.to_string(),
                },
            )
        })
        .collect();
    Err(AggregatedError { errors }.into())
}

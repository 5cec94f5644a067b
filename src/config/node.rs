//! The configuration tree.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::env::{EnvSource, ProcessEnv};
use crate::lock::ConfigLock;
use crate::param::Param;
use crate::sync::{LoadErrorHandler, exit_on_load_error};

use super::error::{BoxError, CommandErrorKind, ConfigError, ParamErrorKind, SubCommandPath};

/// Completion callback run after a successful resolution of its node.
pub type Callback = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;

/// One node of the configuration tree: its parameters and subcommands.
///
/// The root node also carries the runtime settings used by
/// [`ConfigNode::init`]; those settings are ignored on subcommand nodes.
#[derive(Clone)]
pub struct ConfigNode {
    pub(crate) params: Vec<Param>,
    pub(crate) sub_commands: Vec<(String, ConfigNode)>,
    pub(crate) description: Option<String>,
    pub(crate) callback: Option<Callback>,
    pub(crate) ignore_unknown_flags: bool,
    pub(crate) ignore_sub_commands: bool,
    pub(crate) lock: ConfigLock,
    pub(crate) load_error_handler: LoadErrorHandler,
    pub(crate) env: Arc<dyn EnvSource>,
}

impl ConfigNode {
    /// Starts building a node.
    pub fn builder() -> ConfigNodeBuilder {
        ConfigNodeBuilder::default()
    }

    /// Parameters in declaration order.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Looks up a parameter of this node by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Looks up a direct subcommand by label.
    #[must_use]
    pub fn sub_command(&self, label: &str) -> Option<&Self> {
        self.sub_commands
            .iter()
            .find_map(|(l, node)| (l == label).then_some(node))
    }

    /// Labels of the direct subcommands, in declaration order.
    pub fn sub_command_labels(&self) -> impl Iterator<Item = &str> {
        self.sub_commands.iter().map(|(label, _)| label.as_str())
    }

    /// Returns the node at `path`, or `None` if a label is not declared.
    #[must_use]
    pub fn node_at(&self, path: &SubCommandPath) -> Option<&Self> {
        path.sub_commands()
            .iter()
            .try_fold(self, |node, label| node.sub_command(label))
    }

    /// Returns the deepest node reachable along `path` and its path.
    #[must_use]
    pub fn deepest_node_at(&self, path: &SubCommandPath) -> (&Self, SubCommandPath) {
        let mut node = self;
        let mut reached = SubCommandPath::root();
        for label in path.sub_commands() {
            match node.sub_command(label) {
                Some(child) => {
                    node = child;
                    reached = reached.child(label);
                }
                None => break,
            }
        }
        (node, reached)
    }

    /// Description shown in usage.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The lock held around every parse call.
    ///
    /// Share it to read parsed values consistently while refreshes run.
    #[must_use]
    pub const fn lock(&self) -> &ConfigLock {
        &self.lock
    }
}

impl fmt::Debug for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigNode")
            .field("params", &self.params)
            .field("sub_commands", &self.sub_commands)
            .field("description", &self.description)
            .field("ignore_unknown_flags", &self.ignore_unknown_flags)
            .field("ignore_sub_commands", &self.ignore_sub_commands)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConfigNode`].
#[must_use]
pub struct ConfigNodeBuilder {
    node: ConfigNode,
}

impl Default for ConfigNodeBuilder {
    fn default() -> Self {
        Self {
            node: ConfigNode {
                params: Vec::new(),
                sub_commands: Vec::new(),
                description: None,
                callback: None,
                ignore_unknown_flags: false,
                ignore_sub_commands: false,
                lock: ConfigLock::new(),
                load_error_handler: Arc::new(exit_on_load_error),
                env: Arc::new(ProcessEnv),
            },
        }
    }
}

impl ConfigNodeBuilder {
    /// Adds a parameter.
    pub fn with_param(mut self, param: Param) -> Self {
        self.node.params.push(param);
        self
    }

    /// Adds several parameters.
    pub fn with_params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.node.params.extend(params);
        self
    }

    /// Adds a subcommand.
    pub fn with_sub_command(mut self, label: impl Into<String>, node: ConfigNode) -> Self {
        self.node.sub_commands.push((label.into(), node));
        self
    }

    /// Sets the description shown in usage.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.node.description = Some(description.into());
        self
    }

    /// Sets a callback run once this node's resolution succeeded.
    ///
    /// Only the callback of the deepest node on the resolved path runs.
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn() -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.node.callback = Some(Arc::new(callback));
        self
    }

    /// Stops flag parsing silently at the first undefined flag instead of
    /// failing. Root only.
    pub const fn with_ignore_unknown_flags(mut self, ignore: bool) -> Self {
        self.node.ignore_unknown_flags = ignore;
        self
    }

    /// Skips leading non-flag arguments instead of treating them as
    /// subcommand labels. Root only.
    pub const fn with_ignore_sub_commands(mut self, ignore: bool) -> Self {
        self.node.ignore_sub_commands = ignore;
        self
    }

    /// Uses a caller-provided lock. Root only.
    pub fn with_lock(mut self, lock: ConfigLock) -> Self {
        self.node.lock = lock;
        self
    }

    /// Sets the handler notified of background refresh failures. Root only.
    ///
    /// Defaults to [`exit_on_load_error`].
    pub fn with_load_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, u32, &ConfigError) + Send + Sync + 'static,
    {
        self.node.load_error_handler = Arc::new(handler);
        self
    }

    /// Sets where environment variables are read from. Root only.
    pub fn with_env_source(mut self, env: impl EnvSource + 'static) -> Self {
        self.node.env = Arc::new(env);
        self
    }

    /// Validates and returns the node.
    ///
    /// # Errors
    ///
    /// Returns a definition error for two parameters sharing a name, or for an
    /// empty or repeated subcommand label.
    pub fn build(self) -> Result<ConfigNode, ConfigError> {
        let node = self.node;
        let path = SubCommandPath::root();

        let mut names = HashSet::new();
        for param in &node.params {
            if !names.insert(param.name()) {
                return Err(ConfigError::param(
                    path,
                    param.name(),
                    ParamErrorKind::Definition("param declared twice".to_string()),
                ));
            }
        }

        let mut labels = HashSet::new();
        for (label, _) in &node.sub_commands {
            if label.is_empty() || label.starts_with('-') {
                return Err(ConfigError::command(
                    path,
                    CommandErrorKind::Definition(format!("invalid command label {label:?}")),
                ));
            }
            if !labels.insert(label.as_str()) {
                return Err(ConfigError::command(
                    path,
                    CommandErrorKind::Definition(format!("command {label:?} declared twice")),
                ));
            }
        }

        Ok(node)
    }
}

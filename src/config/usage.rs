//! Usage text, and enrichment of errors with the usage they refer to.

use crate::duration::format_duration;
use crate::param::Param;

use super::error::{CommandErrorKind, ConfigError, SubCommandPath};
use super::node::ConfigNode;

fn indentation(level: usize) -> String {
    "\t".repeat(level)
}

impl Param {
    /// Renders the usage block of this parameter, indented by `indent` tabs.
    #[must_use]
    pub fn usage(&self, indent: usize) -> String {
        let head = indentation(indent);
        let body = indentation(indent + 1);
        let mut out = format!("{head}Param: {}\n", self.name());
        let mut line = |text: &str| {
            out.push_str(&format!("{body}{text}\n"));
        };

        if let Some(description) = self.description() {
            line(&format!("Description: {description}"));
        }
        if !self.examples().is_empty() {
            line(&format!("Example: [{}]", self.examples().join(" ")));
        }
        if !self.default_value().is_empty() {
            line(&format!("Default: {}", self.default_value()));
        }
        if !self.enum_values().is_empty() {
            line(&format!("EnumValues: [{}]", self.enum_values().join(" ")));
        }
        if !self.exclusive().is_empty() {
            line(&format!("Exclusive with: [{}]", self.exclusive().join(" ")));
        }
        if self.is_mandatory() {
            line("Mandatory value.");
        }
        if self.is_sub_command_local() {
            line("This param won't be available in sub commands.");
        }
        match self.flag_name() {
            Some(flag) => line(&format!("Command line flag: -{flag}")),
            None => line("Command line flag disabled."),
        }
        match self.env_var_name() {
            Some(var) => line(&format!("Environment variable name: {var}")),
            None => line("Environment variable disabled."),
        }
        match self.loader() {
            Some(spec) if spec.is_periodic() => line(&format!(
                "Using a custom loader, refresh every {}.",
                format_duration(spec.interval())
            )),
            Some(_) => line("Using a custom loader without periodic update."),
            None => line("No custom loader defined."),
        }
        out
    }
}

impl ConfigNode {
    /// Renders the usage of this node and everything below it, indented by
    /// `indent` tabs. Order follows declaration order.
    #[must_use]
    pub fn usage(&self, indent: usize) -> String {
        let head = indentation(indent);
        let mut out = String::new();

        if let Some(description) = self.description() {
            out.push_str(&format!("{head}Config/Command description: {description}\n\n"));
        }
        for param in self.params() {
            out.push_str(&param.usage(indent + 1));
            out.push('\n');
        }
        for (label, node) in &self.sub_commands {
            out.push_str(&format!("{head}Command: {label}\n"));
            out.push_str(&node.usage(indent + 1));
        }
        out
    }

    /// Finds a parameter by name on the nodes along `path`, root first.
    #[must_use]
    pub fn find_param(&self, path: &SubCommandPath, name: &str) -> Option<&Param> {
        let mut node = self;
        if let Some(param) = node.param(name) {
            return Some(param);
        }
        for label in path.sub_commands() {
            node = node.sub_command(label)?;
            if let Some(param) = node.param(name) {
                return Some(param);
            }
        }
        None
    }

    /// Wraps `error` with the usage it refers to.
    ///
    /// - parameter errors get the usage of that parameter
    /// - node errors get the usage of that node, or of the deepest declared
    ///   node for an undefined command
    /// - aggregated errors get the usage of every parameter involved
    ///
    /// Errors that cannot be attributed, or that already carry usage, are
    /// returned unchanged.
    #[must_use]
    pub fn with_usage(&self, error: ConfigError) -> ConfigError {
        let usage = match &error {
            ConfigError::Param(e) => self.find_param(&e.path, &e.name).map(|p| p.usage(1)),
            ConfigError::Command { path, kind } => match kind {
                CommandErrorKind::UndefinedCommand { .. } => {
                    Some(self.deepest_node_at(path).0.usage(0))
                }
                _ => self.node_at(path).map(|node| node.usage(0)),
            },
            ConfigError::Aggregated(aggregated) => {
                let mut seen: Vec<&str> = Vec::new();
                let mut usage = String::new();
                for e in &aggregated.errors {
                    if seen.contains(&e.name.as_str()) {
                        continue;
                    }
                    seen.push(&e.name);
                    if let Some(param) = self.find_param(&e.path, &e.name) {
                        usage.push_str(&param.usage(1));
                    }
                }
                (!usage.is_empty()).then_some(usage)
            }
            ConfigError::WithUsage { .. } | ConfigError::Cancelled => None,
        };

        match usage {
            Some(usage) => ConfigError::WithUsage {
                error: Box::new(error),
                usage,
            },
            None => error,
        }
    }
}

//! TOML schema file parsing.
//!
//! Describes a command tree with serde: each table holds the parameters of
//! one command and a map of nested commands. Parameters use the field tags
//! of [`crate::schema`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::SchemaFileError;
use crate::config::{ConfigNode, ConfigNodeBuilder};
use crate::duration::parse_duration;
use crate::param::{FileLoader, Param};
use crate::schema::{FieldKind, FieldSchema, ValueStore, param_from_field};

/// Root of a schema file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFile {
    /// Description printed at the top of the usage text
    pub description: Option<String>,

    /// Stop at the first unknown flag instead of failing
    #[serde(default)]
    pub ignore_unknown_flags: bool,

    /// Treat every positional argument as a flag value, never as a command
    #[serde(default)]
    pub ignore_sub_commands: bool,

    /// Root parameters
    #[serde(default)]
    pub params: Vec<ParamSection>,

    /// Sub-commands, keyed by label
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSection>,

    /// Directory relative loader paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One sub-command.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSection {
    /// Description printed in the usage text
    pub description: Option<String>,

    /// Parameters declared by this command
    #[serde(default)]
    pub params: Vec<ParamSection>,

    /// Nested sub-commands, keyed by label
    #[serde(default)]
    pub commands: BTreeMap<String, CommandSection>,
}

/// One parameter.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSection {
    /// Parameter name, also the key in the printed values
    pub name: String,

    /// Value type (default: string)
    #[serde(default)]
    pub kind: FieldKind,

    /// Field tags such as `flag`, `envVar` or `default`
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Hide the parameter from nested commands
    #[serde(default)]
    pub sub_command_local: bool,

    /// Read the value from a file
    pub loader: Option<LoaderSection>,
}

/// File loader attached to a parameter.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderSection {
    /// File to read; the trimmed content is the value
    pub file: PathBuf,

    /// Re-read interval such as `30s` (omit for a single read)
    pub refresh: Option<String>,
}

impl SchemaFile {
    /// Loads a schema from a TOML file.
    ///
    /// Relative loader paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SchemaFileError> {
        let content = std::fs::read_to_string(path).map_err(|e| SchemaFileError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut schema = Self::parse(&content)?;
        schema.base_dir = path.parent().map(Path::to_path_buf);
        Ok(schema)
    }

    /// Parses a schema from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, SchemaFileError> {
        toml::from_str(content).map_err(SchemaFileError::from)
    }

    /// Builds the command tree on top of `root`.
    ///
    /// `root` carries the runtime settings (lock, environment, load error
    /// handler); the schema adds parameters, commands and flag handling.
    /// Parsed values are written to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid refresh interval or an invalid tree.
    pub fn build(
        &self,
        store: &ValueStore,
        root: ConfigNodeBuilder,
    ) -> Result<ConfigNode, SchemaFileError> {
        let mut root = root
            .with_ignore_unknown_flags(self.ignore_unknown_flags)
            .with_ignore_sub_commands(self.ignore_sub_commands)
            .with_params(self.build_params(&self.params, store)?);
        if let Some(description) = &self.description {
            root = root.with_description(description);
        }
        for (label, command) in &self.commands {
            root = root.with_sub_command(label, self.build_command(command, store)?);
        }
        Ok(root.build()?)
    }

    fn build_command(
        &self,
        command: &CommandSection,
        store: &ValueStore,
    ) -> Result<ConfigNode, SchemaFileError> {
        let mut node = ConfigNode::builder().with_params(self.build_params(&command.params, store)?);
        if let Some(description) = &command.description {
            node = node.with_description(description);
        }
        for (label, child) in &command.commands {
            node = node.with_sub_command(label, self.build_command(child, store)?);
        }
        Ok(node.build()?)
    }

    fn build_params(
        &self,
        sections: &[ParamSection],
        store: &ValueStore,
    ) -> Result<Vec<Param>, SchemaFileError> {
        sections
            .iter()
            .map(|section| self.build_param(section, store))
            .collect()
    }

    fn build_param(
        &self,
        section: &ParamSection,
        store: &ValueStore,
    ) -> Result<Param, SchemaFileError> {
        let field = FieldSchema::new(&section.name, section.kind)
            .with_tags(section.tags.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let mut builder =
            param_from_field(&field, "", store)?.with_sub_command_local(section.sub_command_local);

        if let Some(loader) = &section.loader {
            builder = builder.with_loader(FileLoader::new(self.resolve_path(&loader.file)));
            if let Some(raw) = &loader.refresh {
                let interval =
                    parse_duration(raw).map_err(|source| SchemaFileError::InvalidRefresh {
                        param: section.name.clone(),
                        source,
                    })?;
                builder = builder.with_refresh(interval);
            }
        }

        Ok(builder.build()?)
    }

    fn resolve_path(&self, file: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if file.is_relative() => dir.join(file),
            _ => file.to_path_buf(),
        }
    }
}

/// Generates a schema template with comments.
#[must_use]
pub fn default_schema_template() -> String {
    r#"# paramtree schema
#
# Each [[params]] entry declares one parameter. Values are resolved from,
# lowest to highest precedence: the default tag, the loader, the
# environment variable, the command line flag.

description = "Example application"

# Stop at the first unknown flag instead of failing
# ignore_unknown_flags = false

[[params]]
name = "Name"
# One of: string, bool, int, uint, float, duration
kind = "string"
tags = { desc = "User name", default = "guest", examples = "alice;bob" }

[[params]]
name = "Token"
tags = { desc = "API token", flag = "-", envVar = "APP_TOKEN" }
# Read the value from a file, re-reading it every 30 seconds
# loader = { file = "token.txt", refresh = "30s" }

# Sub-commands are selected by their label: paramtree --schema x.toml -- serve
[commands.serve]
description = "Run the server"

[[commands.serve.params]]
name = "Port"
kind = "uint"
tags = { desc = "Listening port", exclusiveTags = "Socket" }

[[commands.serve.params]]
name = "Mode"
tags = { enumValues = "dev;prod", default = "dev" }

[[commands.serve.params]]
name = "Socket"
tags = { desc = "Unix socket path", exclusiveTags = "Port" }

[[commands.serve.params]]
name = "Debug"
kind = "bool"
sub_command_local = true
"#
    .to_string()
}

/// Writes the schema template to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_schema(path: &Path) -> Result<(), SchemaFileError> {
    std::fs::write(path, default_schema_template()).map_err(|e| SchemaFileError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

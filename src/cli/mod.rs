//! Command-line front end of the `paramtree` binary.
//!
//! Provides:
//! - Argument parsing with clap ([`Cli`])
//! - TOML schema files describing a command tree ([`SchemaFile`])
//! - Template generation for `paramtree init`

mod args;
mod error;
mod schema_file;

pub use args::{Cli, Command, DEFAULT_SCHEMA_FILE};
pub use error::SchemaFileError;
pub use schema_file::{
    CommandSection, LoaderSection, ParamSection, SchemaFile, default_schema_template,
    write_default_schema,
};

#[cfg(test)]
mod args_tests;

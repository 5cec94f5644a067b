//! CLI argument parsing using clap.
//!
//! Defines the command-line interface of the `paramtree` binary. Arguments
//! after `--` are not interpreted by clap: they are resolved against the
//! schema.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::duration::parse_duration;

/// Default file name written by `paramtree init`.
pub const DEFAULT_SCHEMA_FILE: &str = "paramtree.toml";

/// paramtree: layered parameter resolution
///
/// Resolves the parameters described in a TOML schema from defaults, files,
/// environment variables and flags, then prints the result as JSON.
#[derive(Debug, Parser)]
#[command(name = "paramtree")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the schema file (required for run mode)
    #[arg(long, short)]
    pub schema: Option<PathBuf>,

    /// Keep running and print the values again whenever a refresh changes them
    #[arg(long)]
    pub watch: bool,

    /// How often to check for refreshed values in watch mode (e.g. 500ms, 2s)
    #[arg(long = "watch-interval", value_parser = parse_duration, default_value = "1s")]
    pub watch_interval: Duration,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Subcommand labels and flags resolved against the schema
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Subcommands for paramtree
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a schema template
    Init {
        /// Output path for the schema file
        #[arg(long, short, default_value = DEFAULT_SCHEMA_FILE)]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Some(Command::Init { .. }))
    }
}

//! Error types for schema files.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::duration::DurationError;

/// Error type for loading, writing and building schema files.
#[derive(Debug, Error)]
pub enum SchemaFileError {
    /// Failed to read the schema file.
    #[error("Failed to read schema file '{}': {source}", path.display())]
    FileRead {
        /// Path to the schema file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML schema.
    #[error("Failed to parse TOML schema: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write the schema file (for the init command).
    #[error("Failed to write schema file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the schema file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No schema file was given for run mode.
    #[error("Missing schema file. Use --schema <FILE>")]
    MissingSchema,

    /// A loader refresh interval could not be parsed.
    #[error("Invalid refresh interval for param '{param}': {source}")]
    InvalidRefresh {
        /// Name of the parameter
        param: String,
        /// Underlying parse error
        #[source]
        source: DurationError,
    },

    /// The schema describes an invalid tree.
    #[error("Invalid schema: {0}")]
    Definition(#[from] ConfigError),
}

//! Configuration tree and resolution.
//!
//! This module provides:
//! - The tree of parameters and subcommands ([`ConfigNode`], [`ConfigNodeBuilder`])
//! - The resolution driver ([`ConfigNode::init`], [`Resolved`])
//! - Usage rendering ([`ConfigNode::usage`], [`ConfigNode::with_usage`])
//! - The error taxonomy ([`ConfigError`])
//!
//! # Precedence
//!
//! Each active parameter is resolved from the following sources (highest
//! priority first):
//!
//! 1. **Command-line flag** - `-Name=value` or `-Name value`
//! 2. **Environment variable** - `Name=value`
//! 3. **Loader** - only consulted when neither of the above supplied a value
//! 4. **Default** - set on the parameter definition
//!
//! Empty values never override a lower-priority source.
//!
//! # Subcommands
//!
//! Leading arguments that do not start with `-` select a path in the tree,
//! e.g. `age city -City=Paris` selects `["", "age", "city"]`. The parameters
//! of every node on the path are active, except those marked sub-command
//! local, which are only active on their own node.
//!
//! # Example
//!
//! ```
//! use paramtree::config::ConfigNode;
//! use paramtree::env::MapEnv;
//! use paramtree::param::Param;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let city = Param::builder("City", |_| Ok(()))
//!     .with_default("Paris")
//!     .build()
//!     .unwrap();
//! let root = ConfigNode::builder()
//!     .with_param(city)
//!     .with_env_source(MapEnv::new())
//!     .build()
//!     .unwrap();
//!
//! let resolved = root
//!     .init(&["-City=Toronto"], &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(resolved.value("City"), Some("Toronto"));
//! # });
//! ```

mod error;
mod node;
mod resolve;
pub(crate) mod state;
mod usage;

#[cfg(test)]
mod usage_tests;

pub use error::{
    AggregatedError, BoxError, CommandErrorKind, ConfigError, ParamError, ParamErrorKind,
    ParseError, ROOT_LABEL, SubCommandPath,
};
pub use node::{Callback, ConfigNode, ConfigNodeBuilder};
pub use resolve::{ActiveParam, ActiveSet, Resolved, split_sub_commands};
pub use state::ParamState;

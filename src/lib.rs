//! paramtree: layered parameter resolution
//!
//! A library for declaring configuration parameters on a tree of
//! sub-commands and resolving each one from a default, a custom loader, an
//! environment variable and a command line flag, with optional periodic
//! refresh of loader-backed values in the background.

pub mod cli;
pub mod config;
pub mod duration;
pub mod env;
pub mod flag;
pub mod lock;
pub mod param;
pub mod schema;
pub mod sync;

#[cfg(test)]
mod test_fixtures;

//! paramtree: layered parameter resolution
//!
//! Entry point for the paramtree application.

use paramtree::cli::{Cli, Command, SchemaFileError, write_default_schema};
use std::process::ExitCode;

mod app;
mod run;

use app::{exit_code, print_schema_hint, setup_tracing};
use run::{RunError, RunOptions};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Handle init subcommand
    if let Some(Command::Init { output }) = &cli.command {
        return handle_init(output);
    }

    let Some(schema) = cli.schema else {
        let e = SchemaFileError::MissingSchema;
        eprintln!("Configuration error: {e}");
        print_schema_hint(&e);
        return exit_code::CONFIG_ERROR;
    };

    setup_tracing(cli.verbose);

    run_application(RunOptions {
        schema,
        args: cli.args,
        watch: cli.watch,
        watch_interval: cli.watch_interval,
    })
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_schema(output) {
        Ok(()) => {
            println!("Schema template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::CONFIG_ERROR
        }
    }
}

/// Runs the main application with the given options.
///
/// Excluded from coverage - requires async runtime.
#[cfg(not(tarpaulin_include))]
fn run_application(options: RunOptions) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create Tokio runtime: {e}");
            return exit_code::runtime_error();
        }
    };

    match runtime.block_on(run::execute(options)) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) if e.is_config_error() => {
            eprintln!("Configuration error: {e}");
            if let RunError::Schema(schema_error) = &e {
                print_schema_hint(schema_error);
            }
            exit_code::CONFIG_ERROR
        }
        Err(e) => {
            tracing::error!("Application error: {e}");
            exit_code::runtime_error()
        }
    }
}

//! Application execution logic.
//!
//! Builds the command tree from the schema file, resolves it against the
//! trailing arguments and prints the values as JSON. In watch mode the
//! values are printed again each time a background refresh changes them.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::signal;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use paramtree::cli::{SchemaFile, SchemaFileError};
use paramtree::config::{ConfigError, ConfigNode, SubCommandPath};
use paramtree::lock::ConfigLock;
use paramtree::schema::{FieldValue, ValueStore};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Smallest accepted watch interval.
const MIN_WATCH_INTERVAL: Duration = Duration::from_millis(10);

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The schema file could not be loaded or built.
    #[error(transparent)]
    Schema(#[from] SchemaFileError),

    /// The arguments did not resolve against the schema.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The resolved values could not be rendered.
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl RunError {
    /// Returns true for errors caused by the schema or the arguments.
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Config(_))
    }
}

/// Runtime options extracted from the command line.
#[derive(Debug)]
pub struct RunOptions {
    /// Schema file describing the command tree
    pub schema: PathBuf,
    /// Arguments resolved against the schema
    pub args: Vec<String>,
    /// Keep printing refreshed values until shutdown
    pub watch: bool,
    /// How often to look for refreshed values
    pub watch_interval: Duration,
}

/// JSON document printed for each resolution.
#[derive(Debug, Serialize)]
struct Output<'a> {
    sub_commands: &'a [String],
    values: &'a BTreeMap<String, FieldValue>,
}

/// Renders the selected path and the stored values as pretty JSON.
fn render_output(
    path: &SubCommandPath,
    values: &BTreeMap<String, FieldValue>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&Output {
        sub_commands: path.sub_commands(),
        values,
    })
}

/// Executes the application.
///
/// Excluded from coverage - reads files, stdout and process signals.
#[cfg(not(tarpaulin_include))]
pub async fn execute(options: RunOptions) -> Result<(), RunError> {
    let schema = SchemaFile::load(&options.schema)?;
    let store = ValueStore::new();
    let lock = ConfigLock::new();
    let root = schema.build(&store, ConfigNode::builder().with_lock(lock.clone()))?;

    let cancel = CancellationToken::new();
    let resolved = root.init(&options.args, &cancel).await?;
    tracing::debug!(
        "Resolved {} parameters on {}",
        resolved.states.len(),
        resolved.path
    );

    let snapshot = {
        let _guard = lock.lock().await;
        store.snapshot()
    };
    println!("{}", render_output(&resolved.path, &snapshot)?);

    let result = if options.watch && !resolved.scheduler.is_empty() {
        let refreshing: Vec<&str> = resolved.scheduler.refreshing().collect();
        tracing::info!("Watching refreshed parameters: {}", refreshing.join(", "));
        watch_loop(
            &store,
            &lock,
            &resolved.path,
            options.watch_interval,
            shutdown_signal(),
            |output| println!("{output}"),
        )
        .await
    } else {
        if options.watch {
            tracing::info!("No parameter refreshes in the background, nothing to watch");
        }
        Ok(())
    };

    cancel.cancel();
    resolved.scheduler.join().await;
    result
}

/// Emits the rendered values whenever they differ from the last emission.
///
/// Snapshots are taken under `lock` so that a refresh is never observed
/// half-applied. Returns when `shutdown` completes.
async fn watch_loop<F, E>(
    store: &ValueStore,
    lock: &ConfigLock,
    path: &SubCommandPath,
    interval: Duration,
    shutdown: F,
    mut emit: E,
) -> Result<(), RunError>
where
    F: Future<Output = ()>,
    E: FnMut(&str),
{
    let interval = interval.max(MIN_WATCH_INTERVAL);
    let mut last = {
        let _guard = lock.lock().await;
        store.snapshot()
    };

    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(());
            }

            _ = ticker.tick() => {
                let current = {
                    let _guard = lock.lock().await;
                    store.snapshot()
                };
                if current != last {
                    tracing::debug!("Refreshed values changed");
                    emit(&render_output(path, &current)?);
                    last = current;
                }
            }
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

//! Background refresh of loader-backed parameters.
//!
//! After a successful resolution, every active parameter whose loader has a
//! non-zero refresh interval (and whose value did not come from an
//! environment variable or a flag) gets its own task. Each task fetches the
//! value once per interval and, when it changed, re-applies the parse
//! function under the shared lock.
//!
//! Fetch, validation and parse failures never touch the parsed value. They
//! are reported to a [`LoadErrorHandler`] together with the number of
//! consecutive failures, and the task keeps running until cancelled.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, ParamErrorKind, SubCommandPath};
use crate::config::state::{apply_locked, validate_value};
use crate::lock::ConfigLock;
use crate::param::Param;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

/// Callback for background refresh failures.
///
/// Receives the parameter name, the number of consecutive failures
/// (starting at 1) and the error.
pub type LoadErrorHandler = Arc<dyn Fn(&str, u32, &ConfigError) + Send + Sync>;

/// Exit code used by [`exit_on_load_error`].
pub const LOAD_ERROR_EXIT_CODE: i32 = 3;

/// Default [`LoadErrorHandler`]: logs the error, prints it to stderr and
/// exits the process with [`LOAD_ERROR_EXIT_CODE`].
pub fn exit_on_load_error(name: &str, consecutive_errors: u32, error: &ConfigError) {
    tracing::error!(param = name, consecutive_errors, "Refresh failed: {error}");
    eprintln!("Error when refreshing param {name:?} ({consecutive_errors} consecutive): {error}");
    std::process::exit(LOAD_ERROR_EXIT_CODE);
}

/// Result of one refresh tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    /// The loader returned nothing new.
    Unchanged,
    /// A new value was parsed.
    Applied,
}

/// State owned by one refresh task.
pub(crate) struct RefreshTask {
    param: Param,
    path: SubCommandPath,
    interval: Duration,
    last_value: String,
    consecutive_errors: u32,
}

impl RefreshTask {
    /// Creates a task for `param`, or `None` if its loader is not periodic.
    pub(crate) fn new(param: Param, path: SubCommandPath, initial_value: String) -> Option<Self> {
        let interval = param.loader().filter(|l| l.is_periodic())?.interval();
        Some(Self {
            param,
            path,
            interval,
            last_value: initial_value,
            consecutive_errors: 0,
        })
    }

    /// Fetches once and applies the value if it changed.
    async fn refresh_once(
        &mut self,
        lock: &ConfigLock,
        cancel: &CancellationToken,
    ) -> Result<RefreshOutcome, ConfigError> {
        let Some(loader) = self.param.loader() else {
            return Ok(RefreshOutcome::Unchanged);
        };

        let value = tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(ConfigError::Cancelled),
            fetched = loader.fetch(cancel) => fetched.map_err(|e| {
                ConfigError::param(self.path.clone(), self.param.name(), ParamErrorKind::LoaderFetch(e))
            })?,
        };

        if value.is_empty() || value == self.last_value {
            return Ok(RefreshOutcome::Unchanged);
        }

        validate_value(&self.param, &self.path, &value)?;
        apply_locked(&self.param, &self.path, &value, lock, cancel).await?;
        self.last_value = value;
        Ok(RefreshOutcome::Applied)
    }

    /// Runs until `cancel` fires.
    async fn run(mut self, lock: ConfigLock, handler: LoadErrorHandler, cancel: CancellationToken) {
        let name = self.param.name().to_string();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.refresh_once(&lock, &cancel).await {
                Ok(RefreshOutcome::Applied) => {
                    tracing::info!(param = %name, "Refreshed value applied");
                    self.consecutive_errors = 0;
                }
                Ok(RefreshOutcome::Unchanged) => {
                    tracing::debug!(param = %name, "Refreshed value unchanged");
                    self.consecutive_errors = 0;
                }
                Err(ConfigError::Cancelled) => break,
                Err(e) => {
                    self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                    tracing::warn!(
                        param = %name,
                        consecutive_errors = self.consecutive_errors,
                        "Refresh failed: {e}"
                    );
                    handler(&name, self.consecutive_errors, &e);
                }
            }
        }

        tracing::debug!(param = %name, "Refresh task stopped");
    }
}

/// Handles to the running refresh tasks of one resolution.
///
/// Tasks stop when the resolution's cancellation token fires. Dropping the
/// scheduler does not stop them.
#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Scheduler {
    /// Creates a scheduler with no tasks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the refresh loop for `task`.
    pub(crate) fn spawn(
        &mut self,
        task: RefreshTask,
        lock: &ConfigLock,
        handler: &LoadErrorHandler,
        cancel: &CancellationToken,
    ) {
        let name = task.param.name().to_string();
        tracing::debug!(
            param = %name,
            interval_ms = u64::try_from(task.interval.as_millis()).unwrap_or(u64::MAX),
            "Starting refresh task"
        );
        let handle = tokio::spawn(task.run(lock.clone(), Arc::clone(handler), cancel.clone()));
        self.tasks.push((name, handle));
    }

    /// Names of the parameters being refreshed.
    pub fn refreshing(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|(name, _)| name.as_str())
    }

    /// Number of running refresh tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if nothing is being refreshed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for every task to finish.
    ///
    /// Only returns once the resolution's cancellation token has fired.
    pub async fn join(self) {
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                tracing::warn!(param = %name, "Refresh task ended abnormally: {e}");
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("refreshing", &self.refreshing().collect::<Vec<_>>())
            .finish()
    }
}

//! Custom value loaders.
//!
//! A [`Loader`] fetches a parameter value from an external source (a file, a
//! secret store, a remote service...). It is consulted when no environment
//! variable or flag supplies the value, and can optionally be polled again on
//! a fixed interval by the refresh scheduler.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::BoxError;

/// Boxed future returned by [`Loader::load`].
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Result<String, LoadError>> + Send + 'a>>;

/// Error type for loader fetches.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading a file failed.
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Any other fetch failure.
    #[error("{0}")]
    Failed(#[source] BoxError),
}

impl LoadError {
    /// Creates a [`LoadError::Failed`] from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into().into())
    }
}

/// Trait for fetching a parameter value.
///
/// An empty string means "no value". The cancellation token is the one passed
/// to resolution; long fetches should watch it to bound their own duration.
///
/// Implementors are stored behind `Arc<dyn Loader>` and shared with background
/// tasks, hence the `Send + Sync` bound and the boxed future.
pub trait Loader: Send + Sync {
    /// Fetches the current value.
    fn load<'a>(&'a self, cancel: &'a CancellationToken) -> LoadFuture<'a>;
}

/// [`Loader`] backed by an async closure. See [`loader_fn`].
pub struct FnLoader<F> {
    f: F,
}

impl<F> fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLoader").finish_non_exhaustive()
    }
}

impl<F, Fut> Loader for FnLoader<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, LoadError>> + Send + 'static,
{
    fn load<'a>(&'a self, cancel: &'a CancellationToken) -> LoadFuture<'a> {
        Box::pin((self.f)(cancel.clone()))
    }
}

/// Wraps a closure returning a future as a [`Loader`].
///
/// # Example
///
/// ```
/// use paramtree::param::{LoadError, loader_fn};
///
/// let loader = loader_fn(|_cancel| async { Ok::<_, LoadError>("Toronto".to_string()) });
/// # let _ = loader;
/// ```
pub const fn loader_fn<F, Fut>(f: F) -> FnLoader<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, LoadError>> + Send + 'static,
{
    FnLoader { f }
}

/// Reads the value from a file, trimming surrounding whitespace.
///
/// A missing file is an error, not an empty value.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    /// Creates a loader reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for FileLoader {
    fn load<'a>(&'a self, _cancel: &'a CancellationToken) -> LoadFuture<'a> {
        Box::pin(async move {
            let content =
                tokio::fs::read_to_string(&self.path)
                    .await
                    .map_err(|source| LoadError::Io {
                        path: self.path.clone(),
                        source,
                    })?;
            Ok(content.trim().to_string())
        })
    }
}

/// A loader together with its refresh interval.
///
/// A zero interval means the loader is consulted once during resolution and
/// never polled again.
#[derive(Clone)]
pub struct LoaderSpec {
    loader: Arc<dyn Loader>,
    interval: Duration,
}

impl LoaderSpec {
    /// Wraps a loader with no periodic refresh.
    pub fn new(loader: impl Loader + 'static) -> Self {
        Self::from_arc(Arc::new(loader))
    }

    /// Wraps an already shared loader with no periodic refresh.
    #[must_use]
    pub fn from_arc(loader: Arc<dyn Loader>) -> Self {
        Self {
            loader,
            interval: Duration::ZERO,
        }
    }

    /// Sets the refresh interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// The refresh interval (zero when not periodic).
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if the loader is polled in the background.
    #[must_use]
    pub const fn is_periodic(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Fetches the current value.
    ///
    /// # Errors
    ///
    /// Propagates the loader's [`LoadError`].
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<String, LoadError> {
        self.loader.load(cancel).await
    }
}

impl fmt::Debug for LoaderSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderSpec")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

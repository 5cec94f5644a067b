//! Cancellable lock guarding caller-owned state.
//!
//! Every parse callback runs while holding a [`ConfigLock`]. The same lock is
//! handed to the caller so that reads of the parsed values can be serialized
//! against background refreshes.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// Returned when a lock wait is interrupted by cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("lock acquisition cancelled")]
pub struct LockCancelled;

/// Guard releasing the lock on drop.
pub type ConfigLockGuard = OwnedMutexGuard<()>;

/// A mutex without data, shared between the resolver and the caller.
///
/// Cloning is cheap and yields a handle to the same lock.
///
/// # Example
///
/// ```
/// use paramtree::lock::ConfigLock;
/// use tokio_util::sync::CancellationToken;
///
/// # tokio_test_block_on(async {
/// let lock = ConfigLock::new();
/// let cancel = CancellationToken::new();
///
/// let guard = lock.lock_with_cancel(&cancel).await.unwrap();
/// drop(guard);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLock {
    inner: Arc<Mutex<()>>,
}

impl ConfigLock {
    /// Creates a new, unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the lock is acquired.
    pub async fn lock(&self) -> ConfigLockGuard {
        Arc::clone(&self.inner).lock_owned().await
    }

    /// Waits until the lock is acquired or `cancel` fires, whichever comes first.
    ///
    /// # Errors
    ///
    /// Returns [`LockCancelled`] if the token is (or becomes) cancelled before
    /// the lock is obtained.
    pub async fn lock_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ConfigLockGuard, LockCancelled> {
        if cancel.is_cancelled() {
            return Err(LockCancelled);
        }
        tokio::select! {
            biased;

            () = cancel.cancelled() => Err(LockCancelled),
            guard = Arc::clone(&self.inner).lock_owned() => Ok(guard),
        }
    }

    /// Acquires the lock from synchronous code.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    #[must_use]
    pub fn blocking_lock(&self) -> ConfigLockGuard {
        Arc::clone(&self.inner).blocking_lock_owned()
    }

    /// Attempts to acquire the lock without waiting.
    #[must_use]
    pub fn try_lock(&self) -> Option<ConfigLockGuard> {
        Arc::clone(&self.inner).try_lock_owned().ok()
    }
}

//! Many-reader/one-writer lock around shared state.
//!
//! Wraps [`std::sync::RwLock`] so that callers never see a `Result`:
//!
//! - A failure inside the primitive itself (the standard library reports these
//!   by panicking from `read`/`write`, e.g. reader-count overflow or a detected
//!   self-deadlock) leaves the synchronization state untrustworthy. It is logged
//!   and the process aborts.
//! - Poisoning only records that some holder panicked. The lock itself is
//!   intact, so the flag is cleared and the guard is handed out.
//!
//! Reentrant acquisition from the same thread is undefined. Do not rely on it.

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::{LockResult, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError};

use tracing::{error, warn};

/// Requested access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared access; any number of readers may hold the lock at once.
    Read,
    /// Exclusive access; excludes every reader and every other writer.
    Write,
}

impl LockMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// Guard returned by [`ReadWriteLock::acquire`]. Dropping it releases the lock.
pub enum LockGuard<'a, T: ?Sized> {
    Read(RwLockReadGuard<'a, T>),
    Write(RwLockWriteGuard<'a, T>),
}

impl<T: ?Sized> LockGuard<'_, T> {
    #[must_use]
    pub fn mode(&self) -> LockMode {
        match self {
            Self::Read(_) => LockMode::Read,
            Self::Write(_) => LockMode::Write,
        }
    }

    /// Mutable access, only available when held in write mode.
    pub fn as_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Read(_) => None,
            Self::Write(guard) => Some(&mut **guard),
        }
    }

    /// Relinquish whichever mode is held.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: ?Sized> Deref for LockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Read(guard) => guard,
            Self::Write(guard) => guard,
        }
    }
}

/// Reader/writer lock owning the value it protects.
///
/// The lock cannot be dropped while a guard is alive: guards borrow it.
#[derive(Default)]
pub struct ReadWriteLock<T: ?Sized> {
    inner: RwLock<T>,
}

impl<T> ReadWriteLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Consume the lock and return the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> ReadWriteLock<T> {
    /// Block until the lock is available in `mode`.
    pub fn acquire(&self, mode: LockMode) -> LockGuard<'_, T> {
        match mode {
            LockMode::Read => LockGuard::Read(self.read()),
            LockMode::Write => LockGuard::Write(self.write()),
        }
    }

    /// Block until shared access is available.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.acquire_or_abort(LockMode::Read, || self.inner.read())
    }

    /// Block until exclusive access is available.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.acquire_or_abort(LockMode::Write, || self.inner.write())
    }

    /// Shared access without blocking, or `None` while a writer holds the lock.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        match self.inner.try_read() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(poisoned)) => Some(self.recover(LockMode::Read, poisoned)),
        }
    }

    /// Exclusive access without blocking, or `None` while any holder exists.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        match self.inner.try_write() {
            Ok(guard) => Some(guard),
            Err(TryLockError::WouldBlock) => None,
            Err(TryLockError::Poisoned(poisoned)) => Some(self.recover(LockMode::Write, poisoned)),
        }
    }

    /// Run `work` with shared access. The lock is released on every exit path,
    /// including unwinding, before the outcome reaches the caller.
    pub fn with_read<U>(&self, work: impl FnOnce(&T) -> U) -> U {
        let guard = self.read();
        work(&guard)
    }

    /// Run `work` with exclusive access. Released on every exit path.
    pub fn with_write<U>(&self, work: impl FnOnce(&mut T) -> U) -> U {
        let mut guard = self.write();
        work(&mut guard)
    }

    /// Run `work` holding the lock in `mode`. Released on every exit path.
    pub fn with_lock<U>(
        &self,
        mode: LockMode,
        work: impl FnOnce(&mut LockGuard<'_, T>) -> U,
    ) -> U {
        let mut guard = self.acquire(mode);
        work(&mut guard)
    }

    /// Mutable access through an exclusive borrow; no locking needed.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire_or_abort<G>(&self, mode: LockMode, lock: impl FnOnce() -> LockResult<G>) -> G {
        match panic::catch_unwind(AssertUnwindSafe(lock)) {
            Ok(Ok(guard)) => guard,
            Ok(Err(poisoned)) => self.recover(mode, poisoned),
            Err(payload) => primitive_failure(mode, payload.as_ref()),
        }
    }

    fn recover<G>(&self, mode: LockMode, poisoned: PoisonError<G>) -> G {
        warn!(
            mode = mode.label(),
            "lock was poisoned by a panicking holder; clearing"
        );
        self.inner.clear_poison();
        poisoned.into_inner()
    }
}

impl<T: ?Sized> fmt::Debug for ReadWriteLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadWriteLock").finish_non_exhaustive()
    }
}

#[cold]
fn primitive_failure(mode: LockMode, payload: &(dyn Any + Send)) -> ! {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown failure");
    error!(
        mode = mode.label(),
        detail, "reader/writer lock primitive failed; aborting"
    );
    process::abort()
}

//! Worker pool sizing.
//!
//! A pool with zero workers is a configuration error, so the size is validated
//! once at the boundary and carried as a type that cannot be zero.

use std::fmt;
use std::num::NonZeroUsize;
use std::thread;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("worker pool size must be at least 1 (got {requested})")]
pub struct PoolSizeError {
    pub requested: usize,
}

/// Number of workers in a render pool. Always `>= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PoolSize(NonZeroUsize);

impl PoolSize {
    /// A single-worker pool.
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    /// Validate a raw worker count. Zero is rejected, never clamped.
    pub fn new(workers: usize) -> Result<Self, PoolSizeError> {
        NonZeroUsize::new(workers)
            .map(Self)
            .ok_or(PoolSizeError { requested: workers })
    }

    /// One worker per available hardware thread, or a single worker when
    /// parallelism cannot be queried.
    #[must_use]
    pub fn available_parallelism() -> Self {
        thread::available_parallelism().map_or(Self::ONE, Self)
    }

    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for PoolSize {
    fn default() -> Self {
        Self::available_parallelism()
    }
}

impl TryFrom<usize> for PoolSize {
    type Error = PoolSizeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PoolSize> for usize {
    fn from(value: PoolSize) -> Self {
        value.get()
    }
}

impl From<NonZeroUsize> for PoolSize {
    fn from(value: NonZeroUsize) -> Self {
        Self(value)
    }
}

impl fmt::Display for PoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

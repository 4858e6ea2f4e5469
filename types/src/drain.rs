//! Drain backoff tuning.
//!
//! A dispatcher drain is a polling barrier. Each wait lasts `poll_interval` per
//! outstanding render, capped at `max_interval`, so a heavily loaded pool is
//! rechecked less often than one with a single render left.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DrainPolicyError {
    /// A zero interval would turn the drain loop into a busy spin.
    #[error("drain poll interval must be non-zero")]
    ZeroPollInterval,
    #[error("drain max interval ({max:?}) is shorter than the poll interval ({poll:?})")]
    CapBelowInterval { poll: Duration, max: Duration },
}

/// Validated drain backoff. `poll_interval > 0` and
/// `max_interval >= poll_interval` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainPolicy {
    poll_interval: Duration,
    max_interval: Duration,
}

impl Default for DrainPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(50),
        }
    }
}

impl DrainPolicy {
    pub fn new(
        poll_interval: Duration,
        max_interval: Duration,
    ) -> Result<Self, DrainPolicyError> {
        if poll_interval.is_zero() {
            return Err(DrainPolicyError::ZeroPollInterval);
        }
        if max_interval < poll_interval {
            return Err(DrainPolicyError::CapBelowInterval {
                poll: poll_interval,
                max: max_interval,
            });
        }
        Ok(Self {
            poll_interval,
            max_interval,
        })
    }

    /// Wait per outstanding render.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Upper bound on a single wait.
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// How long to sleep before rechecking with `outstanding` renders in flight.
    #[must_use]
    pub fn interval_for(&self, outstanding: usize) -> Duration {
        let factor = u32::try_from(outstanding).unwrap_or(u32::MAX);
        self.poll_interval
            .saturating_mul(factor)
            .min(self.max_interval)
    }
}

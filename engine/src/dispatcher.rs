//! Round-robin render dispatch over a fixed pool of stateful workers.
//!
//! The cursor and per-slot outstanding counters live behind one
//! [`ReadWriteLock`]. Dispatch takes the write lock only long enough to pick a
//! slot and bump its counter; the render itself runs with the lock released.
//! Settling a [`Completion`] re-takes the write lock to decrement the counter,
//! whatever the render's outcome.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use quill_types::{
    DrainPolicy, PoolSize, PoolSizeError, RenderError, RenderOutput, RenderRequest,
};
use quill_utils::ReadWriteLock;
use tracing::{debug, error, info, trace};

use crate::error::DispatchError;
use crate::renderer::Renderer;

struct WorkerSlot {
    renderer: Arc<dyn Renderer>,
    outstanding: usize,
}

struct Pool {
    slots: Box<[WorkerSlot]>,
    /// Last slot handed out; `None` until the first dispatch.
    cursor: Option<usize>,
}

impl Pool {
    fn advance(&mut self) -> usize {
        let next = self.cursor.map_or(0, |last| (last + 1) % self.slots.len());
        self.cursor = Some(next);
        next
    }

    fn outstanding(&self) -> usize {
        self.slots.iter().map(|slot| slot.outstanding).sum()
    }
}

type SharedPool = Arc<ReadWriteLock<Option<Pool>>>;

/// Outstanding work on one slot at the moment of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLoad {
    pub index: usize,
    pub outstanding: usize,
}

/// Fans render requests across a fixed worker pool, round-robin.
///
/// Construction is cheap; workers are built by the first [`initialize`] call.
///
/// [`initialize`]: RenderDispatcher::initialize
pub struct RenderDispatcher {
    pool: SharedPool,
    policy: DrainPolicy,
}

impl Default for RenderDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(DrainPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: DrainPolicy) -> Self {
        Self {
            pool: Arc::new(ReadWriteLock::new(None)),
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> DrainPolicy {
        self.policy
    }

    /// Build `size` workers with `factory`, called once per slot index.
    ///
    /// Only the first call builds anything. Later calls leave the existing pool
    /// in place, never invoke their factory, and return `false`.
    ///
    /// The factory runs while the pool's write lock is held: it must not call
    /// back into this dispatcher, or it deadlocks.
    pub fn initialize<R, F>(&self, size: PoolSize, mut factory: F) -> bool
    where
        R: Renderer + 'static,
        F: FnMut(usize) -> R,
    {
        self.pool.with_write(|pool| {
            if let Some(existing) = pool.as_ref() {
                debug!(
                    workers = existing.slots.len(),
                    requested = size.get(),
                    "Render pool already initialized; ignoring"
                );
                return false;
            }
            let slots = (0..size.get())
                .map(|index| WorkerSlot {
                    renderer: Arc::new(factory(index)),
                    outstanding: 0,
                })
                .collect();
            *pool = Some(Pool {
                slots,
                cursor: None,
            });
            info!(workers = size.get(), "Render pool initialized");
            true
        })
    }

    /// [`initialize`](Self::initialize) from a raw worker count.
    ///
    /// # Panics
    ///
    /// A count of zero is an invariant violation, not a recoverable error: it
    /// is logged and the call panics before anything is built. Validate
    /// untrusted counts with [`PoolSize::new`] first.
    pub fn initialize_with_count<R, F>(&self, workers: usize, factory: F) -> bool
    where
        R: Renderer + 'static,
        F: FnMut(usize) -> R,
    {
        let size = match PoolSize::new(workers) {
            Ok(size) => size,
            Err(e) => invalid_pool_size(&e),
        };
        self.initialize(size, factory)
    }

    /// Assign `request` to the next slot and count it as outstanding.
    ///
    /// Nothing is rendered yet: the caller drives [`PendingRender::run`] with
    /// the lock already released. There is no admission control; dispatch
    /// never fails because workers are busy.
    pub fn dispatch(&self, request: RenderRequest) -> Result<PendingRender, DispatchError> {
        let (slot, renderer) = self
            .pool
            .with_write(|pool| -> Option<(usize, Arc<dyn Renderer>)> {
                let pool = pool.as_mut()?;
                let index = pool.advance();
                let slot = &mut pool.slots[index];
                slot.outstanding += 1;
                Some((index, Arc::clone(&slot.renderer)))
            })
            .ok_or(DispatchError::Uninitialized)?;

        trace!(slot, template = request.template(), "Dispatched render");
        Ok(PendingRender {
            slot,
            renderer,
            request,
            completion: Completion {
                pool: Arc::clone(&self.pool),
                slot,
            },
        })
    }

    /// Dispatch and run in one step.
    pub async fn render(&self, request: RenderRequest) -> Result<RenderOutput, DispatchError> {
        let pending = self.dispatch(request)?;
        Ok(pending.run().await?)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.pool.with_read(Option::is_some)
    }

    /// Number of workers, or 0 before initialization.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool
            .with_read(|pool| pool.as_ref().map_or(0, |pool| pool.slots.len()))
    }

    /// Total renders dispatched but not yet settled.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pool
            .with_read(|pool| pool.as_ref().map_or(0, Pool::outstanding))
    }

    #[must_use]
    pub fn slot_loads(&self) -> Vec<SlotLoad> {
        self.pool.with_read(|pool| {
            pool.as_ref()
                .map(|pool| {
                    pool.slots
                        .iter()
                        .enumerate()
                        .map(|(index, slot)| SlotLoad {
                            index,
                            outstanding: slot.outstanding,
                        })
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// True iff no slot has outstanding work.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.outstanding() == 0
    }

    /// Block the calling thread until every dispatched render has settled.
    ///
    /// Polls with a wait proportional to the outstanding count. Meant for
    /// teardown and tests; from async code, call it via `spawn_blocking`.
    pub fn drain(&self) {
        loop {
            let outstanding = self.outstanding();
            if outstanding == 0 {
                return;
            }
            let wait = self.policy.interval_for(outstanding);
            trace!(
                outstanding,
                wait_us = wait.as_micros() as u64,
                "Waiting for renders to drain"
            );
            thread::sleep(wait);
        }
    }

    /// Like [`drain`](Self::drain), giving up after `limit`.
    ///
    /// Returns whether the dispatcher drained in time.
    pub fn drain_timeout(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            let outstanding = self.outstanding();
            if outstanding == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(outstanding, "Drain timed out");
                return false;
            }
            thread::sleep(self.policy.interval_for(outstanding).min(deadline - now));
        }
    }
}

#[cold]
fn invalid_pool_size(err: &PoolSizeError) -> ! {
    error!(requested = err.requested, "render pool cannot be empty");
    panic!("{err}")
}

/// A dispatched render that has not run yet.
///
/// Dropping it without running still settles the slot's counter.
pub struct PendingRender {
    slot: usize,
    renderer: Arc<dyn Renderer>,
    request: RenderRequest,
    completion: Completion,
}

impl PendingRender {
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    /// Invoke the slot's renderer and settle the completion.
    ///
    /// The renderer's error is returned unchanged. The counter is settled on
    /// success, on failure, and if this future is dropped or unwinds.
    pub async fn run(self) -> Result<RenderOutput, RenderError> {
        let Self {
            slot,
            renderer,
            request,
            completion,
        } = self;

        let result = renderer.render(&request).await;
        match &result {
            Ok(output) => trace!(slot, bytes = output.len(), "Render finished"),
            Err(e) => debug!(slot, template = request.template(), error = %e, "Render failed"),
        }
        completion.complete();
        result
    }

    /// Split into the renderer handle, the request, and the completion token,
    /// for callers that drive the renderer themselves.
    #[must_use]
    pub fn into_parts(self) -> (Arc<dyn Renderer>, RenderRequest, Completion) {
        (self.renderer, self.request, self.completion)
    }
}

/// Settles one dispatched render when completed or dropped.
pub struct Completion {
    pool: SharedPool,
    slot: usize,
}

impl Completion {
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Mark the render as finished. Equivalent to dropping the token.
    pub fn complete(self) {
        drop(self);
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        let slot = self.slot;
        self.pool.with_write(|pool| {
            if let Some(worker) = pool.as_mut().and_then(|pool| pool.slots.get_mut(slot)) {
                worker.outstanding = worker.outstanding.saturating_sub(1);
                trace!(slot, outstanding = worker.outstanding, "Render settled");
            }
        });
    }
}

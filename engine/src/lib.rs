//! Render dispatch for Quill.
//!
//! [`RenderDispatcher`] fans render requests across a fixed pool of stateful
//! [`Renderer`]s in round-robin order and tracks in-flight work so callers can
//! block until everything dispatched has finished.

mod dispatcher;
mod error;
mod renderer;

pub use dispatcher::{Completion, PendingRender, RenderDispatcher, SlotLoad};
pub use error::DispatchError;
pub use renderer::{RenderFut, Renderer};

// Re-export the domain types that appear in this crate's signatures.
pub use quill_types::{
    DrainPolicy, DrainPolicyError, PoolSize, PoolSizeError, RenderError, RenderOutput,
    RenderRequest,
};

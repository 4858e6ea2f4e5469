//! Core domain types for Quill.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the toolkit: the dispatcher,
//! the tag scanner, and configuration loading.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod drain;
mod pool;
mod render;
mod tags;

pub use drain::{DrainPolicy, DrainPolicyError};
pub use pool::{PoolSize, PoolSizeError};
pub use render::{RenderError, RenderOutput, RenderRequest};
pub use tags::{DEFAULT_CLOSERS, DEFAULT_OPENERS, DEFAULT_TAG_INDICATOR, TagRegistry};

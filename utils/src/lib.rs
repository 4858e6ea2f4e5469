//! Shared infrastructure utilities for Quill.
//!
//! This crate provides cross-cutting primitives that multiple Quill crates need
//! but that don't belong in the domain-pure `quill-types` crate:
//!
//! - **`rwlock`**: Many-reader/one-writer locking with fatal-on-primitive-failure semantics

pub mod rwlock;

pub use rwlock::{LockGuard, LockMode, ReadWriteLock};

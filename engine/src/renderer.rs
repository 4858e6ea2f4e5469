//! The renderer capability injected into each worker slot.

use std::future::Future;
use std::pin::Pin;

use quill_types::{RenderError, RenderOutput, RenderRequest};

/// Deferred render result.
pub type RenderFut<'a> =
    Pin<Box<dyn Future<Output = Result<RenderOutput, RenderError>> + Send + 'a>>;

/// A stateful template renderer occupying one pool slot.
///
/// The dispatcher never looks inside the future; it only needs to know when
/// it settles. Implementations own their template loading and caching.
pub trait Renderer: Send + Sync {
    fn render<'a>(&'a self, request: &'a RenderRequest) -> RenderFut<'a>;
}

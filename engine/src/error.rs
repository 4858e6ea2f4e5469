use quill_types::RenderError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("render dispatcher used before initialize()")]
    Uninitialized,
    /// The renderer's own error, passed through untouched.
    #[error(transparent)]
    Render(#[from] RenderError),
}

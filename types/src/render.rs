//! Render request and result types exchanged with pooled renderers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A request to render one template against a data context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    template: String,
    #[serde(default)]
    context: Value,
}

impl RenderRequest {
    #[must_use]
    pub fn new(template: impl Into<String>, context: Value) -> Self {
        Self {
            template: template.into(),
            context,
        }
    }

    /// Request with an empty (`null`) context.
    #[must_use]
    pub fn without_context(template: impl Into<String>) -> Self {
        Self::new(template, Value::Null)
    }

    /// Template identifier, resolved by the renderer's own source loader.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn context(&self) -> &Value {
        &self.context
    }
}

/// Bytes produced by a successful render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderOutput(Vec<u8>);

impl RenderOutput {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for RenderOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for RenderOutput {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

/// Failure reported by a renderer.
///
/// The dispatcher never inspects or rewrites these; they reach the caller
/// exactly as the renderer produced them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template '{name}' not found")]
    TemplateNotFound { name: String },
    #[error("syntax error in template '{template}': {message}")]
    Syntax { template: String, message: String },
    #[error("failed to evaluate template '{template}': {message}")]
    Evaluation { template: String, message: String },
    #[error("I/O error while rendering: {message}")]
    Io { message: String },
    #[error("{0}")]
    Other(String),
}

// SPDX-License-Identifier: MIT

//! Typed error handling for flowrun-rs
//!
//! Runtime failures inside a run (branch resolution, node invocation) never
//! escape the runner; they are folded into result entries. The errors here
//! are what the runner folds, plus the loading/config errors that callers
//! see through `Result`.

use thiserror::Error;

/// Top-level error type for flowrun-rs
#[derive(Debug, Error)]
pub enum FlowError {
    /// Configuration errors (invalid env vars, bad CLI values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structural problems found before a run starts
    #[error("Invalid flow: {0}")]
    Validation(String),

    /// Flow file or id could not be located
    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    /// File extension the loader does not understand
    #[error("Unsupported flow format: {0}")]
    UnsupportedFormat(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Reasons a branch could not be resolved for a node.
///
/// `NoMatchingCondition` is the normal way a conditional path ends; the
/// other two point at a badly authored node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConditionError {
    /// `inputParameters` was not a JSON object
    #[error("parse error: {0}")]
    Parse(String),

    /// Categories are declared but there is nothing to test them against
    #[error("missing parameters")]
    MissingParameters,

    /// No condition matched the input
    #[error("no matching condition")]
    NoMatchingCondition,
}

/// Failures reported by a [`NodeInvoker`](crate::engine::invoker::NodeInvoker)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    /// No operation is registered for the node's kind
    #[error("unsupported node type: {0}")]
    UnsupportedKind(String),

    /// The operation ran and failed
    #[error("{message}")]
    Failed { kind: String, message: String },
}

impl FlowError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl InvokeError {
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<String> for FlowError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for FlowError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

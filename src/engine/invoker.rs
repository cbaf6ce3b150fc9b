// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use super::error::InvokeError;
use super::node::Node;

/// Performs the actual work of a node.
///
/// The runner treats the returned payload as opaque and copies it into the
/// node's result entry. Implementations dispatch on `node.kind` and should
/// answer kinds they don't know with [`InvokeError::UnsupportedKind`].
#[async_trait]
pub trait NodeInvoker: Send + Sync {
    /// Run the node once and return its payload
    async fn invoke(&self, node: &Node) -> Result<Value, InvokeError>;
}

// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use super::order::order;
use crate::engine::{Edge, Node};

/// Result of checking a flow before it runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub message: String,
}

impl ValidationReport {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

/// Check that a flow can run: it has nodes and no circular dependency.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
    if nodes.is_empty() {
        return ValidationReport::invalid("Flow has no nodes; add a node before running it");
    }

    let order = order(nodes, edges);
    if !order.is_acyclic() {
        let mut involved: Vec<&str> = order.stranded().iter().map(|n| n.id.as_str()).collect();
        if involved.is_empty() {
            // Every node sits on a cycle; the queue only ran from the fallback seed
            involved = order.ids();
        }
        return ValidationReport::invalid(format!(
            "Flow contains a circular dependency and cannot run: {}",
            involved.join(", ")
        ));
    }

    ValidationReport::ok(format!(
        "Flow is valid; {} node(s) will run in order",
        nodes.len()
    ))
}

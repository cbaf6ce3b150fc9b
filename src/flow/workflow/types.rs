// SPDX-License-Identifier: MIT

//! Flow record definitions
//!
//! The shapes flows are saved and exchanged in. Storage itself lives
//! outside this crate; these types only fix the format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{Edge, Node};

pub const FLOW_RECORD_VERSION: &str = "1.0";

/// Nodes and edges without any metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlowGraph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// A saved flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    FLOW_RECORD_VERSION.to_string()
}

impl FlowRecord {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_flow_id(),
            name: name.into(),
            description: description.into(),
            nodes,
            edges,
            created_at: now,
            updated_at: now,
            version: default_version(),
        }
    }

    /// Replace the graph and bump `updated_at`
    pub fn update(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Copy of the graph, as stored alongside execution records
    pub fn snapshot(&self) -> FlowGraph {
        FlowGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Display name, falling back to a placeholder for unnamed flows
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Untitled flow"
        } else {
            &self.name
        }
    }
}

impl From<FlowGraph> for FlowRecord {
    fn from(graph: FlowGraph) -> Self {
        FlowRecord::new("", "", graph.nodes, graph.edges)
    }
}

fn new_flow_id() -> String {
    format!("flow_{}", Uuid::new_v4().simple())
}

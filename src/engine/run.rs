// SPDX-License-Identifier: MIT

//! Run-time records: status transitions, per-node results and the summary

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a node within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Running => "running",
            NodeStatus::Success => "success",
            NodeStatus::Error => "error",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run walks the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Every node in topological order
    #[default]
    Static,
    /// One path from the start node, chosen by branch conditions
    Dynamic,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Static => "static",
            RunMode::Dynamic => "dynamic",
        })
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(RunMode::Static),
            "dynamic" => Ok(RunMode::Dynamic),
            other => Err(format!("Unknown run mode: {}", other)),
        }
    }
}

/// A single lifecycle transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    pub node_id: String,
    pub status: NodeStatus,
    pub error_message: Option<String>,
}

impl NodeUpdate {
    pub fn new(node_id: impl Into<String>, status: NodeStatus) -> Self {
        Self {
            node_id: node_id.into(),
            status,
            error_message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// One branch condition as it was checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionCheck {
    pub index: usize,
    pub category: Option<String>,
    pub parameter: Option<String>,
    pub expected: Option<String>,
    /// Input value for `parameter`, rendered as text
    pub actual: Option<String>,
    pub matched: bool,
    /// Condition lacked a parameter or value
    pub skipped: bool,
}

/// How the next node was chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConditionTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<ConditionCheck>,
    pub matched_index: Option<usize>,
    pub matched_category: Option<String>,
    pub next_node_id: Option<String>,
}

/// Outcome of one attempted node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub node_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_trace: Option<ConditionTrace>,
}

impl RunResult {
    pub fn succeeded(node_id: impl Into<String>, result: Value) -> Self {
        Self {
            node_id: node_id.into(),
            success: true,
            result: Some(result),
            error: None,
            condition_trace: None,
        }
    }

    pub fn failed(node_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            success: false,
            result: None,
            error: Some(error.into()),
            condition_trace: None,
        }
    }

    pub fn with_trace(mut self, trace: ConditionTrace) -> Self {
        self.condition_trace = Some(trace);
        self
    }
}

/// Aggregate produced once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_nodes: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub results: Vec<RunResult>,
}

impl RunSummary {
    /// Counts are derived from `results`
    pub fn new(total_nodes: usize, results: Vec<RunResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            total_nodes,
            success_count,
            error_count: results.len() - success_count,
            results,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }
}

/// Everything a run reports, in the order it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RunEvent {
    NodeUpdate(NodeUpdate),
    Completed(RunSummary),
}

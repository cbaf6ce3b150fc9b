// SPDX-License-Identifier: MIT

//! Node state table reduced from run events

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::engine::{NodeStatus, NodeUpdate, RunEvent, RunObserver, RunSummary};

/// Latest known state of one node
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub status: NodeStatus,
    pub error_message: Option<String>,
}

/// Per-node status table owned by the caller.
///
/// The runner never touches this directly; it is fed the same transitions
/// any other observer sees and folds them in, last write wins.
#[derive(Debug, Clone, Default)]
pub struct NodeStateTable {
    states: HashMap<String, NodeState>,
    summary: Option<RunSummary>,
}

impl NodeStateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one transition into the table
    pub fn apply(&mut self, update: &NodeUpdate) {
        let state = self.states.entry(update.node_id.clone()).or_default();
        state.status = update.status;
        state.error_message = update.error_message.clone();

        // A fresh pending reset means a new run has begun
        if update.status == NodeStatus::Pending && update.error_message.is_none() {
            self.summary = None;
        }
    }

    /// Fold any run event into the table
    pub fn apply_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::NodeUpdate(update) => self.apply(update),
            RunEvent::Completed(summary) => self.summary = Some(summary.clone()),
        }
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeState> {
        self.states.get(node_id)
    }

    pub fn status(&self, node_id: &str) -> Option<NodeStatus> {
        self.states.get(node_id).map(|s| s.status)
    }

    /// Number of nodes currently in `status`
    pub fn count(&self, status: NodeStatus) -> usize {
        self.states.values().filter(|s| s.status == status).count()
    }

    /// Summary of the last finished run, if it has finished
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.summary.is_some()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.states.keys()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.summary = None;
    }

    /// Convert the table to a JSON object keyed by node id
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.states
                .iter()
                .map(|(k, v)| {
                    (
                        k.clone(),
                        serde_json::to_value(v).unwrap_or(Value::Null),
                    )
                })
                .collect(),
        )
    }
}

impl RunObserver for NodeStateTable {
    fn on_node_update(&mut self, update: &NodeUpdate) {
        self.apply(update);
    }

    fn on_complete(&mut self, summary: &RunSummary) {
        self.summary = Some(summary.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_table() {
        let table = NodeStateTable::new();
        assert!(table.get("anything").is_none());
        assert!(!table.is_complete());
    }

    #[test]
    fn test_last_update_wins() {
        let mut table = NodeStateTable::new();
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Pending));
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Running));
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Error).with_message("boom"));

        let state = table.get("a_1").unwrap();
        assert_eq!(state.status, NodeStatus::Error);
        assert_eq!(state.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_message_cleared_on_next_transition() {
        let mut table = NodeStateTable::new();
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Error).with_message("boom"));
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Pending));
        assert_eq!(table.get("a_1").unwrap().error_message, None);
    }

    #[test]
    fn test_counts() {
        let mut table = NodeStateTable::new();
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Success));
        table.apply(&NodeUpdate::new("b_1", NodeStatus::Success));
        table.apply(&NodeUpdate::new("c_1", NodeStatus::Error));

        assert_eq!(table.count(NodeStatus::Success), 2);
        assert_eq!(table.count(NodeStatus::Error), 1);
        assert_eq!(table.count(NodeStatus::Running), 0);
    }

    #[test]
    fn test_completion_and_reset() {
        let mut table = NodeStateTable::new();
        table.on_node_update(&NodeUpdate::new("a_1", NodeStatus::Success));
        table.on_complete(&RunSummary::new(1, vec![]));
        assert!(table.is_complete());

        // Next run resets every node to pending
        table.on_node_update(&NodeUpdate::new("a_1", NodeStatus::Pending));
        assert!(!table.is_complete());
    }

    #[test]
    fn test_skip_message_does_not_reset_summary() {
        let mut table = NodeStateTable::new();
        table.apply_event(&RunEvent::Completed(RunSummary::new(2, vec![])));
        table.apply_event(&RunEvent::NodeUpdate(
            NodeUpdate::new("b_1", NodeStatus::Pending).with_message("skipped"),
        ));
        assert!(table.is_complete());
    }

    #[test]
    fn test_to_json() {
        let mut table = NodeStateTable::new();
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Running));

        let json = table.to_json();
        assert_eq!(json["a_1"], json!({"status": "running", "errorMessage": null}));
    }

    #[test]
    fn test_clear() {
        let mut table = NodeStateTable::new();
        table.apply(&NodeUpdate::new("a_1", NodeStatus::Running));
        table.clear();
        assert_eq!(table.node_ids().count(), 0);
    }
}

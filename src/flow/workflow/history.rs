// SPDX-License-Identifier: MIT

//! Execution history records and statistics
//!
//! `ExecutionRecord` is the exchange format for a finished run. The
//! in-memory `ExecutionHistory` keeps the most recent records, newest first;
//! where they are persisted is up to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use super::types::{FlowGraph, FlowRecord};
use crate::engine::{RunResult, RunSummary};

/// Most records kept by [`ExecutionHistory`]
pub const MAX_HISTORY: usize = 100;

const UNKNOWN_FLOW_ID: &str = "unknown";

/// Overall outcome of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    PartialSuccess,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::PartialSuccess => "partial_success",
        }
    }
}

/// A finished run together with the graph it ran on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub flow_id: String,
    pub flow_name: String,
    /// Wall-clock duration in milliseconds
    pub execution_time: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_nodes: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub status: ExecutionStatus,
    pub results: Vec<RunResult>,
    pub flow_snapshot: FlowGraph,
}

impl ExecutionRecord {
    pub fn new(
        flow: &FlowRecord,
        summary: &RunSummary,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let execution_time = (end_time - start_time).num_milliseconds().max(0) as u64;
        let flow_id = if flow.id.is_empty() {
            UNKNOWN_FLOW_ID.to_string()
        } else {
            flow.id.clone()
        };

        Self {
            id: format!("exec_{}", Uuid::new_v4().simple()),
            flow_id,
            flow_name: flow.display_name().to_string(),
            execution_time,
            start_time,
            end_time,
            total_nodes: summary.total_nodes,
            success_count: summary.success_count,
            error_count: summary.error_count,
            status: if summary.error_count > 0 {
                ExecutionStatus::PartialSuccess
            } else {
                ExecutionStatus::Success
            },
            results: summary.results.clone(),
            flow_snapshot: flow.snapshot(),
        }
    }

    fn matches(&self, term: &str) -> bool {
        self.flow_name.to_lowercase().contains(term)
            || self.status.as_str().contains(term)
            || self.results.iter().any(|r| {
                r.node_id.to_lowercase().contains(term)
                    || r
                        .error
                        .as_deref()
                        .is_some_and(|e| e.to_lowercase().contains(term))
            })
    }
}

/// Flow run most often
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowCount {
    pub name: String,
    pub count: usize,
}

/// Aggregate numbers over a set of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_executions: usize,
    /// Percentage of fully successful runs, one decimal
    pub success_rate: f64,
    /// Milliseconds, rounded
    pub average_execution_time: u64,
    pub total_nodes_executed: usize,
    pub most_executed_flow: Option<FlowCount>,
}

impl ExecutionStats {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ExecutionRecord>,
    {
        let mut total = 0usize;
        let mut successful = 0usize;
        let mut total_time = 0u64;
        let mut total_nodes = 0usize;
        // name -> (count, first position) so ties go to the most recent flow
        let mut per_flow: HashMap<&str, (usize, usize)> = HashMap::new();

        for (position, record) in records.into_iter().enumerate() {
            total += 1;
            if record.status == ExecutionStatus::Success {
                successful += 1;
            }
            total_time += record.execution_time;
            total_nodes += record.total_nodes;
            per_flow
                .entry(record.flow_name.as_str())
                .or_insert((0, position))
                .0 += 1;
        }

        if total == 0 {
            return Self {
                total_executions: 0,
                success_rate: 0.0,
                average_execution_time: 0,
                total_nodes_executed: 0,
                most_executed_flow: None,
            };
        }

        let most_executed_flow = per_flow
            .into_iter()
            .max_by(|(_, (ca, pa)), (_, (cb, pb))| ca.cmp(cb).then(pb.cmp(pa)))
            .map(|(name, (count, _))| FlowCount {
                name: name.to_string(),
                count,
            });

        Self {
            total_executions: total,
            success_rate: (successful as f64 / total as f64 * 1000.0).round() / 10.0,
            average_execution_time: (total_time as f64 / total as f64).round() as u64,
            total_nodes_executed: total_nodes,
            most_executed_flow,
        }
    }
}

/// Most recent execution records, newest first
#[derive(Debug, Clone)]
pub struct ExecutionHistory {
    records: VecDeque<ExecutionRecord>,
    capacity: usize,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
        }
    }

    /// Restore from previously saved records (newest first)
    pub fn from_records(records: Vec<ExecutionRecord>) -> Self {
        let mut history = Self::new();
        history.records = records.into_iter().take(history.capacity).collect();
        history
    }

    /// Add a record at the front, dropping the oldest beyond capacity.
    ///
    /// Returns the stored record; a zero-capacity history keeps nothing.
    pub fn record(&mut self, record: ExecutionRecord) -> Option<&ExecutionRecord> {
        self.records.push_front(record);
        self.records.truncate(self.capacity);
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.records.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ExecutionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn recent(&self, limit: usize) -> Vec<&ExecutionRecord> {
        self.records.iter().take(limit).collect()
    }

    pub fn for_flow(&self, flow_id: &str) -> Vec<&ExecutionRecord> {
        self.records.iter().filter(|r| r.flow_id == flow_id).collect()
    }

    /// Case-insensitive search over flow name, status, node ids and errors
    pub fn search(&self, term: &str) -> Vec<&ExecutionRecord> {
        let term = term.to_lowercase();
        self.records.iter().filter(|r| r.matches(&term)).collect()
    }

    /// Drop records of one flow, or everything when `flow_id` is `None`
    pub fn clear(&mut self, flow_id: Option<&str>) {
        match flow_id {
            Some(id) => self.records.retain(|r| r.flow_id != id),
            None => self.records.clear(),
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        ExecutionStats::from_records(self.records.iter())
    }

    pub fn to_vec(&self) -> Vec<ExecutionRecord> {
        self.records.iter().cloned().collect()
    }
}

impl Default for ExecutionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// Human readable duration: `850ms`, `2.5s`, `3m 5s`
pub fn format_execution_time(milliseconds: u64) -> String {
    if milliseconds < 1_000 {
        format!("{}ms", milliseconds)
    } else if milliseconds < 60_000 {
        format!("{:.1}s", milliseconds as f64 / 1_000.0)
    } else {
        let minutes = milliseconds / 60_000;
        let seconds = ((milliseconds % 60_000) as f64 / 1_000.0).round() as u64;
        format!("{}m {}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Edge, Node};
    use chrono::Duration;
    use serde_json::json;

    fn flow(name: &str) -> FlowRecord {
        FlowRecord::new(
            name,
            "",
            vec![Node::new("auth_1", "Auth"), Node::new("risk_1", "Risk")],
            vec![Edge::new("auth_1", "risk_1")],
        )
    }

    fn record(flow: &FlowRecord, failed: bool, millis: i64) -> ExecutionRecord {
        let results = if failed {
            vec![
                RunResult::succeeded("auth_1", json!({})),
                RunResult::failed("risk_1", "Risk model unavailable"),
            ]
        } else {
            vec![
                RunResult::succeeded("auth_1", json!({})),
                RunResult::succeeded("risk_1", json!({})),
            ]
        };
        let summary = RunSummary::new(2, results);
        let start = Utc::now();
        ExecutionRecord::new(flow, &summary, start, start + Duration::milliseconds(millis))
    }

    #[test]
    fn test_record_from_summary() {
        let flow = flow("Login");
        let rec = record(&flow, true, 1500);

        assert!(rec.id.starts_with("exec_"));
        assert_eq!(rec.flow_id, flow.id);
        assert_eq!(rec.flow_name, "Login");
        assert_eq!(rec.execution_time, 1500);
        assert_eq!(rec.status, ExecutionStatus::PartialSuccess);
        assert_eq!(rec.error_count, 1);
        assert_eq!(rec.flow_snapshot.nodes.len(), 2);
    }

    #[test]
    fn test_record_for_unsaved_flow() {
        let mut flow = flow("");
        flow.id.clear();
        let rec = record(&flow, false, 10);
        assert_eq!(rec.flow_id, "unknown");
        assert_eq!(rec.flow_name, "Untitled flow");
        assert_eq!(rec.status, ExecutionStatus::Success);
    }

    #[test]
    fn test_record_serializes_contract_fields() {
        let rec = record(&flow("Login"), true, 10);
        let value = serde_json::to_value(&rec).unwrap();
        for key in [
            "id",
            "flowId",
            "flowName",
            "executionTime",
            "startTime",
            "endTime",
            "totalNodes",
            "successCount",
            "errorCount",
            "status",
            "results",
            "flowSnapshot",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["status"], "partial_success");
        assert!(value["flowSnapshot"]["nodes"].is_array());
    }

    #[test]
    fn test_history_newest_first_and_capped() {
        let flow = flow("Login");
        let mut history = ExecutionHistory::with_capacity(3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(history.record(record(&flow, false, 10)).unwrap().id.clone());
        }

        assert_eq!(history.len(), 3);
        let kept: Vec<_> = history.iter().map(|r| r.id.clone()).collect();
        assert_eq!(kept, vec![ids[4].clone(), ids[3].clone(), ids[2].clone()]);
        assert_eq!(history.recent(1)[0].id, ids[4]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = ExecutionHistory::with_capacity(0);
        assert!(history.record(record(&flow("Login"), false, 10)).is_none());
        assert!(history.is_empty());
        assert_eq!(history.stats().total_executions, 0);
    }

    #[test]
    fn test_default_capacity() {
        let flow = flow("Login");
        let mut history = ExecutionHistory::new();
        for _ in 0..(MAX_HISTORY + 5) {
            history.record(record(&flow, false, 1));
        }
        assert_eq!(history.len(), MAX_HISTORY);
    }

    #[test]
    fn test_filter_and_clear_by_flow() {
        let login = flow("Login");
        let pay = flow("Pay");
        let mut history = ExecutionHistory::new();
        history.record(record(&login, false, 1));
        history.record(record(&pay, false, 1));
        history.record(record(&login, true, 1));

        assert_eq!(history.for_flow(&login.id).len(), 2);

        history.clear(Some(&login.id));
        assert_eq!(history.len(), 1);
        assert_eq!(history.iter().next().unwrap().flow_name, "Pay");

        history.clear(None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_search() {
        let mut history = ExecutionHistory::new();
        history.record(record(&flow("Login"), false, 1));
        history.record(record(&flow("Payments"), true, 1));

        assert_eq!(history.search("login").len(), 1);
        assert_eq!(history.search("PARTIAL").len(), 1);
        assert_eq!(history.search("risk_1").len(), 2);
        assert_eq!(history.search("model unavailable").len(), 1);
        assert!(history.search("nothing-like-this").is_empty());
    }

    #[test]
    fn test_stats() {
        let login = flow("Login");
        let pay = flow("Pay");
        let mut history = ExecutionHistory::new();
        history.record(record(&login, false, 100));
        history.record(record(&login, true, 200));
        history.record(record(&pay, false, 301));

        let stats = history.stats();
        assert_eq!(stats.total_executions, 3);
        assert_eq!(stats.success_rate, 66.7);
        assert_eq!(stats.average_execution_time, 200);
        assert_eq!(stats.total_nodes_executed, 6);
        assert_eq!(
            stats.most_executed_flow,
            Some(FlowCount {
                name: "Login".to_string(),
                count: 2
            })
        );
    }

    #[test]
    fn test_stats_empty() {
        let stats = ExecutionHistory::new().stats();
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.most_executed_flow.is_none());
    }

    #[test]
    fn test_from_records_roundtrip() {
        let mut history = ExecutionHistory::new();
        history.record(record(&flow("Login"), false, 1));
        let restored = ExecutionHistory::from_records(history.to_vec());
        assert_eq!(restored.len(), 1);
        let id = history.iter().next().unwrap().id.clone();
        assert!(restored.get(&id).is_some());
    }

    #[test]
    fn test_format_execution_time() {
        assert_eq!(format_execution_time(850), "850ms");
        assert_eq!(format_execution_time(2_500), "2.5s");
        assert_eq!(format_execution_time(185_000), "3m 5s");
    }
}

// SPDX-License-Identifier: MIT

//! Flow runner
//!
//! Drives nodes through pending → running → success/error, one at a time.
//! Failures never escape as `Err`: they become result entries and status
//! transitions. The caller's node and edge slices are borrowed for the whole
//! run and are never modified.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use super::order::order;
use crate::engine::{
    Edge, Node, NodeInvoker, NodeStatus, NodeUpdate, RunMode, RunObserver, RunResult, RunSummary,
};
use crate::flow::workflow::condition;

/// Pause after each attempted node so observers can follow along
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(300);

/// Message attached to nodes not attempted after an earlier failure
pub const SKIPPED_MESSAGE: &str = "skipped because an upstream node failed";

/// Node id used for the synthetic result of a dynamic run with no entry node
pub const NO_START_NODE_ID: &str = "flow";

pub const NO_START_MESSAGE: &str = "no start node found; a dynamic run needs a node of kind 'start'";

/// Runs flows against a [`NodeInvoker`]
#[derive(Clone)]
pub struct FlowRunner {
    invoker: Arc<dyn NodeInvoker>,
    step_delay: Duration,
}

impl FlowRunner {
    pub fn new(invoker: Arc<dyn NodeInvoker>) -> Self {
        Self {
            invoker,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }

    /// Run in the given mode
    pub async fn run(
        &self,
        mode: RunMode,
        nodes: &[Node],
        edges: &[Edge],
        observer: &mut dyn RunObserver,
    ) -> RunSummary {
        match mode {
            RunMode::Static => self.run_static(nodes, edges, observer).await,
            RunMode::Dynamic => self.run_dynamic(nodes, edges, observer).await,
        }
    }

    /// Run every node in topological order.
    ///
    /// After the first failure the remaining nodes are reported as pending
    /// with [`SKIPPED_MESSAGE`] and are not invoked.
    pub async fn run_static(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        observer: &mut dyn RunObserver,
    ) -> RunSummary {
        let order = order(nodes, edges);
        log::info!(
            "Static run order: {:?}",
            order.nodes().iter().map(|n| n.label()).collect::<Vec<_>>()
        );

        reset(nodes, observer);

        let mut results = Vec::new();
        let mut failed = false;

        for node in order.nodes() {
            if failed {
                observer.on_node_update(
                    &NodeUpdate::new(&node.id, NodeStatus::Pending).with_message(SKIPPED_MESSAGE),
                );
                continue;
            }

            match self.attempt(node, observer).await {
                Ok(payload) => results.push(RunResult::succeeded(&node.id, payload)),
                Err(message) => {
                    results.push(RunResult::failed(&node.id, message));
                    failed = true;
                }
            }

            self.pause().await;
        }

        self.finish(RunSummary::new(order.len(), results), observer)
    }

    /// Follow a single path from the first start node.
    ///
    /// At each node the branch is resolved before the node is invoked; an
    /// unresolvable branch or a failed invocation ends the run. A missing or
    /// unknown next node ends it normally. Nodes are visited at most once.
    pub async fn run_dynamic(
        &self,
        nodes: &[Node],
        edges: &[Edge],
        observer: &mut dyn RunObserver,
    ) -> RunSummary {
        reset(nodes, observer);

        let Some(start) = nodes.iter().find(|n| n.kind.is_start()) else {
            log::error!("Dynamic run aborted: {}", NO_START_MESSAGE);
            let summary =
                RunSummary::new(0, vec![RunResult::failed(NO_START_NODE_ID, NO_START_MESSAGE)]);
            return self.finish(summary, observer);
        };

        let mut by_id: HashMap<&str, &Node> = HashMap::with_capacity(nodes.len());
        for node in nodes {
            by_id.entry(node.id.as_str()).or_insert(node);
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut results = Vec::new();
        let mut current = Some(start);

        while let Some(node) = current.take() {
            if !visited.insert(node.id.as_str()) {
                log::warn!("Node {} already visited; stopping", node.id);
                break;
            }

            observer.on_node_update(&NodeUpdate::new(&node.id, NodeStatus::Running));

            let resolution = match condition::resolve(node, edges) {
                Ok(resolution) => resolution,
                Err(unresolved) => {
                    let reason = unresolved.to_string();
                    log::warn!("Node {} could not choose a branch: {}", node.id, reason);
                    observer.on_node_update(
                        &NodeUpdate::new(&node.id, NodeStatus::Error).with_message(&reason),
                    );
                    results.push(RunResult::failed(&node.id, reason).with_trace(unresolved.trace));
                    self.pause().await;
                    break;
                }
            };

            match self.invoke(node, observer).await {
                Ok(payload) => {
                    results.push(
                        RunResult::succeeded(&node.id, payload).with_trace(resolution.trace),
                    );
                }
                Err(message) => {
                    results.push(RunResult::failed(&node.id, message).with_trace(resolution.trace));
                    self.pause().await;
                    break;
                }
            }

            self.pause().await;

            current = match resolution.next_node_id.as_deref() {
                Some(next_id) => {
                    let next = by_id.get(next_id).copied();
                    if next.is_none() {
                        log::info!("Next node {} from {} is unknown; path ends", next_id, node.id);
                    }
                    next
                }
                None => {
                    log::info!("Path ends at {}", node.id);
                    None
                }
            };
        }

        self.finish(RunSummary::new(visited.len(), results), observer)
    }

    /// Mark running, then invoke
    async fn attempt(
        &self,
        node: &Node,
        observer: &mut dyn RunObserver,
    ) -> Result<serde_json::Value, String> {
        observer.on_node_update(&NodeUpdate::new(&node.id, NodeStatus::Running));
        self.invoke(node, observer).await
    }

    /// Invoke a node that is already running and report the outcome
    async fn invoke(
        &self,
        node: &Node,
        observer: &mut dyn RunObserver,
    ) -> Result<serde_json::Value, String> {
        log::info!("Executing node: {} ({})", node.label(), node.kind);

        match self.invoker.invoke(node).await {
            Ok(payload) => {
                observer.on_node_update(&NodeUpdate::new(&node.id, NodeStatus::Success));
                log::info!("Node {} completed", node.id);
                Ok(payload)
            }
            Err(e) => {
                let message = e.to_string();
                observer.on_node_update(
                    &NodeUpdate::new(&node.id, NodeStatus::Error).with_message(&message),
                );
                log::error!("Node {} failed: {}", node.id, message);
                Err(message)
            }
        }
    }

    async fn pause(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }

    fn finish(&self, summary: RunSummary, observer: &mut dyn RunObserver) -> RunSummary {
        log::info!(
            "Run finished: {} node(s), {} succeeded, {} failed",
            summary.total_nodes,
            summary.success_count,
            summary.error_count
        );
        observer.on_complete(&summary);
        summary
    }
}

/// Every run starts from a clean slate
fn reset(nodes: &[Node], observer: &mut dyn RunObserver) {
    for node in nodes {
        observer.on_node_update(&NodeUpdate::new(&node.id, NodeStatus::Pending));
    }
}

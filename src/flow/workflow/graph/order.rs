// SPDX-License-Identifier: MIT

//! Execution ordering (Kahn's algorithm)

use std::collections::{HashMap, VecDeque};

use crate::engine::{Edge, Node};

/// A total execution order over a node set.
///
/// `order()` always covers every node so that a static run can label all of
/// them, but it also remembers how much of the order the in-degree queue
/// produced on its own. That prefix is what cycle detection looks at.
#[derive(Debug, Clone)]
pub struct ExecutionOrder<'a> {
    nodes: Vec<&'a Node>,
    covered: usize,
    fallback_seed: bool,
}

impl<'a> ExecutionOrder<'a> {
    /// Nodes in execution order
    pub fn nodes(&self) -> &[&'a Node] {
        &self.nodes
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes placed by the queue before any repair
    pub fn covered(&self) -> usize {
        self.covered
    }

    /// Nodes appended after the queue drained (stuck inside a cycle)
    pub fn stranded(&self) -> &[&'a Node] {
        &self.nodes[self.covered..]
    }

    /// True when no node had zero in-degree and the first node was used to seed the queue
    pub fn used_fallback_seed(&self) -> bool {
        self.fallback_seed
    }

    /// The queue alone reached every node from genuine roots
    pub fn is_acyclic(&self) -> bool {
        !self.fallback_seed && self.covered == self.nodes.len()
    }

    pub fn into_nodes(self) -> Vec<&'a Node> {
        self.nodes
    }
}

/// Compute a deterministic execution order.
///
/// Edges whose endpoints are not both in `nodes` are ignored. Ties are
/// broken breadth-first in declaration order.
pub fn order<'a>(nodes: &'a [Node], edges: &[Edge]) -> ExecutionOrder<'a> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(node.id.as_str()).or_insert(i);
    }

    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    let mut in_degree: Vec<usize> = vec![0; nodes.len()];

    for edge in edges {
        if let (Some(&source), Some(&target)) = (
            index.get(edge.source.as_str()),
            index.get(edge.target.as_str()),
        ) {
            downstream[source].push(target);
            in_degree[target] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();

    let fallback_seed = queue.is_empty() && !nodes.is_empty();
    if fallback_seed {
        queue.push_back(0);
    }

    let mut placed = vec![false; nodes.len()];
    let mut ordered: Vec<&Node> = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        // A fallback seed sits on a cycle and can drop to zero again later
        if placed[current] {
            continue;
        }
        placed[current] = true;
        ordered.push(&nodes[current]);

        for &next in &downstream[current] {
            if in_degree[next] == 0 {
                continue;
            }
            in_degree[next] -= 1;
            if in_degree[next] == 0 && !placed[next] {
                queue.push_back(next);
            }
        }
    }

    let covered = ordered.len();
    if covered < nodes.len() {
        log::debug!(
            "Ordering placed {} of {} nodes; appending stranded nodes",
            covered,
            nodes.len()
        );
    }

    for (i, node) in nodes.iter().enumerate() {
        if !placed[i] {
            ordered.push(node);
        }
    }

    ExecutionOrder {
        nodes: ordered,
        covered,
        fallback_seed,
    }
}

// SPDX-License-Identifier: MIT

//! Branch resolution for a single node

use std::fmt;

use crate::engine::node::value_as_text;
use crate::engine::{ConditionCheck, ConditionError, ConditionTrace, Edge, Node, SourceHandle};

/// Where to go after a node
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// `None` when the chosen transition has no edge (the path ends here)
    pub next_node_id: Option<String>,
    pub matched_category: Option<String>,
    pub trace: ConditionTrace,
}

/// Why no transition could be chosen, with whatever was checked on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Unresolved {
    pub reason: ConditionError,
    pub trace: ConditionTrace,
}

impl Unresolved {
    fn new(reason: ConditionError, trace: ConditionTrace) -> Self {
        Self { reason, trace }
    }
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reason.fmt(f)
    }
}

impl std::error::Error for Unresolved {}

/// Resolve the outgoing transition of `node`.
///
/// Nodes without categories follow their default edge. Otherwise the first
/// condition (in index order) whose parameter is in the input and whose
/// value matches as text selects `source-category-{i}`.
pub fn resolve(node: &Node, edges: &[Edge]) -> Result<Resolution, Unresolved> {
    if !node.has_branches() {
        let next_node_id = outgoing(node, edges, &SourceHandle::Default);
        return Ok(Resolution {
            trace: ConditionTrace {
                next_node_id: next_node_id.clone(),
                ..Default::default()
            },
            next_node_id,
            matched_category: None,
        });
    }

    let input = match node.data.input_parameters.as_ref().map(|p| p.decode()) {
        None | Some(Ok(None)) => {
            return Err(Unresolved::new(
                ConditionError::MissingParameters,
                ConditionTrace::default(),
            ))
        }
        Some(Err(e)) => return Err(Unresolved::new(e, ConditionTrace::default())),
        Some(Ok(Some(map))) => map,
    };

    let mut trace = ConditionTrace {
        input: Some(input.clone()),
        ..Default::default()
    };

    for (index, condition) in node.data.category_conditions.iter().enumerate() {
        let category = node.data.categories.get(index).cloned();

        let Some((parameter, expected)) = condition.parts() else {
            trace.checks.push(ConditionCheck {
                index,
                category,
                parameter: condition.parameter.clone(),
                expected: condition.value.as_ref().map(value_as_text),
                actual: None,
                matched: false,
                skipped: true,
            });
            continue;
        };

        let actual = input.get(parameter).map(value_as_text);
        let matched = actual.as_deref() == Some(expected.as_str());

        trace.checks.push(ConditionCheck {
            index,
            category: category.clone(),
            parameter: Some(parameter.to_string()),
            expected: Some(expected),
            actual,
            matched,
            skipped: false,
        });

        if matched {
            let next_node_id = outgoing(node, edges, &SourceHandle::Category(index));
            trace.matched_index = Some(index);
            trace.matched_category = category.clone();
            trace.next_node_id = next_node_id.clone();
            return Ok(Resolution {
                next_node_id,
                matched_category: category,
                trace,
            });
        }
    }

    Err(Unresolved::new(ConditionError::NoMatchingCondition, trace))
}

/// Target of the first edge leaving `node` through `handle`
fn outgoing(node: &Node, edges: &[Edge], handle: &SourceHandle) -> Option<String> {
    edges
        .iter()
        .find(|e| e.source == node.id && e.handle() == *handle)
        .map(|e| e.target.clone())
}

// SPDX-License-Identifier: MIT

//! Node and edge definitions
//!
//! These are the caller-owned topology types. The engine only ever borrows
//! them; run-time status lives in [`NodeUpdate`](super::run::NodeUpdate)
//! events, never on the node itself.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

use super::error::ConditionError;

/// Separator between the kind prefix and the rest of a legacy node id
pub const KIND_SEPARATOR: char = '_';

/// The operation a node performs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    /// Entry point for dynamic runs
    Start,
    Auth,
    Account,
    Transaction,
    Risk,
    Payment,
    Verify,
    Balance,
    Validate,
    Fraud,
    Notify,
    Audit,
    Report,
    Sync,
    /// Anything without a known operation
    Other(String),
}

impl NodeKind {
    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Start => "start",
            NodeKind::Auth => "auth",
            NodeKind::Account => "account",
            NodeKind::Transaction => "transaction",
            NodeKind::Risk => "risk",
            NodeKind::Payment => "payment",
            NodeKind::Verify => "verify",
            NodeKind::Balance => "balance",
            NodeKind::Validate => "validate",
            NodeKind::Fraud => "fraud",
            NodeKind::Notify => "notify",
            NodeKind::Audit => "audit",
            NodeKind::Report => "report",
            NodeKind::Sync => "sync",
            NodeKind::Other(s) => s,
        }
    }

    /// Recover the kind from a legacy id such as `auth_1728391`
    pub fn from_id(id: &str) -> Self {
        let prefix = id.split(KIND_SEPARATOR).next().unwrap_or(id);
        Self::from(prefix)
    }

    pub fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start)
    }
}

impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "start" => NodeKind::Start,
            "auth" => NodeKind::Auth,
            "account" => NodeKind::Account,
            "transaction" => NodeKind::Transaction,
            "risk" => NodeKind::Risk,
            "payment" => NodeKind::Payment,
            "verify" => NodeKind::Verify,
            "balance" => NodeKind::Balance,
            "validate" => NodeKind::Validate,
            "fraud" => NodeKind::Fraud,
            "notify" => NodeKind::Notify,
            "audit" => NodeKind::Audit,
            "report" => NodeKind::Report,
            "sync" => NodeKind::Sync,
            other => NodeKind::Other(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from(s.as_str())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work in the flow graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "NodeRecord")]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub data: NodeData,
}

/// Wire shape of a node. Older flows carry no `kind` and rely on the id prefix.
#[derive(Deserialize)]
struct NodeRecord {
    id: String,
    #[serde(default)]
    kind: Option<NodeKind>,
    #[serde(default)]
    data: NodeData,
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        let kind = record
            .kind
            .unwrap_or_else(|| NodeKind::from_id(&record.id));
        Self {
            id: record.id,
            kind,
            data: record.data,
        }
    }
}

impl Node {
    /// Create a node whose kind is taken from the id prefix
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            kind: NodeKind::from_id(&id),
            id,
            data: NodeData {
                label: label.into(),
                ..Default::default()
            },
        }
    }

    /// Add a branch: category name plus the `parameter == value` test selecting it
    pub fn with_branch(
        mut self,
        category: impl Into<String>,
        parameter: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.data.categories.push(category.into());
        self.data.category_conditions.push(CategoryCondition {
            parameter: Some(parameter.into()),
            value: Some(value.into()),
        });
        self
    }

    pub fn with_input(mut self, input: InputParameters) -> Self {
        self.data.input_parameters = Some(input);
        self
    }

    pub fn label(&self) -> &str {
        if self.data.label.is_empty() {
            &self.id
        } else {
            &self.data.label
        }
    }

    pub fn has_branches(&self) -> bool {
        !self.data.categories.is_empty()
    }
}

/// Author-supplied node payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default)]
    pub label: String,
    /// Branch names, parallel to `category_conditions`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_conditions: Vec<CategoryCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_parameters: Option<InputParameters>,
}

/// `parameter == value` test that selects a branch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryCondition {
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl CategoryCondition {
    /// Both sides present and non-empty
    pub fn parts(&self) -> Option<(&str, String)> {
        let parameter = self.parameter.as_deref().filter(|p| !p.is_empty())?;
        let value = self.value.as_ref().map(value_as_text)?;
        if value.is_empty() {
            return None;
        }
        Some((parameter, value))
    }
}

/// Runtime payload a node's branches are tested against
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputParameters {
    /// Key/value map
    Structured(Map<String, Value>),
    /// Legacy JSON-encoded object
    Encoded(String),
}

impl InputParameters {
    /// Decode into a key/value map. An empty legacy string means "no input".
    pub fn decode(&self) -> Result<Option<Map<String, Value>>, ConditionError> {
        match self {
            InputParameters::Structured(map) => Ok(Some(map.clone())),
            InputParameters::Encoded(raw) if raw.trim().is_empty() => Ok(None),
            InputParameters::Encoded(raw) => {
                match serde_json::from_str::<Value>(raw)
                    .map_err(|e| ConditionError::Parse(e.to_string()))?
                {
                    Value::Object(map) => Ok(Some(map)),
                    other => Err(ConditionError::Parse(format!(
                        "expected a JSON object, found {}",
                        json_type_name(&other)
                    ))),
                }
            }
        }
    }
}

impl From<Map<String, Value>> for InputParameters {
    fn from(map: Map<String, Value>) -> Self {
        InputParameters::Structured(map)
    }
}

/// Directed connection between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
            source_handle: None,
        }
    }

    /// Bind the edge to branch `index` of its source node
    pub fn for_category(mut self, index: usize) -> Self {
        self.source_handle = Some(SourceHandle::Category(index).to_string());
        self
    }

    pub fn handle(&self) -> SourceHandle {
        SourceHandle::parse(self.source_handle.as_deref())
    }
}

/// Which outgoing transition an edge represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceHandle {
    /// No handle, or the plain `source` handle
    Default,
    /// `source-category-{i}`
    Category(usize),
    Other(String),
}

const CATEGORY_HANDLE_PREFIX: &str = "source-category-";

impl SourceHandle {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("source") => SourceHandle::Default,
            Some(handle) => handle
                .strip_prefix(CATEGORY_HANDLE_PREFIX)
                .and_then(|digits| {
                    // Only the canonical form binds: no signs, no leading zeros
                    let index: usize = digits.parse().ok()?;
                    (index.to_string() == digits).then_some(index)
                })
                .map(SourceHandle::Category)
                .unwrap_or_else(|| SourceHandle::Other(handle.to_string())),
        }
    }
}

impl fmt::Display for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceHandle::Default => f.write_str("source"),
            SourceHandle::Category(i) => write!(f, "{}{}", CATEGORY_HANDLE_PREFIX, i),
            SourceHandle::Other(s) => f.write_str(s),
        }
    }
}

/// Render a JSON value the way branch comparison sees it
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_as_text(n),
        other => other.to_string(),
    }
}

/// Numbers render the way flow authors see them in the editor: `500.0` is
/// `500`, very large or very small magnitudes use `1e+21` / `1e-7`.
fn number_as_text(number: &Number) -> String {
    if let Some(i) = number.as_i64() {
        return i.to_string();
    }
    if let Some(u) = number.as_u64() {
        return u.to_string();
    }
    match number.as_f64() {
        Some(f) => float_as_text(f),
        None => number.to_string(),
    }
}

fn float_as_text(f: f64) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let exp = format!("{:e}", f);
        return match exp.split_once('e') {
            Some((mantissa, power)) if !power.starts_with('-') => {
                format!("{}e+{}", mantissa, power)
            }
            _ => exp,
        };
    }
    // Display prints the shortest round-trip digits without a trailing `.0`
    f.to_string()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_id_prefix() {
        assert_eq!(NodeKind::from_id("auth_172839"), NodeKind::Auth);
        assert_eq!(NodeKind::from_id("start_1"), NodeKind::Start);
        assert_eq!(NodeKind::from_id("payment"), NodeKind::Payment);
        assert_eq!(
            NodeKind::from_id("llm_42"),
            NodeKind::Other("llm".to_string())
        );
    }

    #[test]
    fn test_node_without_kind_uses_id_prefix() {
        let node: Node = serde_json::from_value(json!({
            "id": "risk_99",
            "data": { "label": "Risk check" }
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::Risk);
        assert_eq!(node.label(), "Risk check");
    }

    #[test]
    fn test_explicit_kind_wins_over_prefix() {
        let node: Node = serde_json::from_value(json!({
            "id": "auth_1",
            "kind": "audit",
            "data": {}
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::Audit);
    }

    #[test]
    fn test_node_serializes_kind() {
        let node = Node::new("notify_3", "Notify user");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["kind"], "notify");
        assert_eq!(value["data"]["label"], "Notify user");
        assert!(value["data"].get("categories").is_none());
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let node = Node::new("sync_1", "");
        assert_eq!(node.label(), "sync_1");
    }

    #[test]
    fn test_branch_data_deserialize() {
        let node: Node = serde_json::from_value(json!({
            "id": "start_1",
            "data": {
                "label": "Start",
                "categories": ["low", "high"],
                "categoryConditions": [
                    { "parameter": "level", "value": "1" },
                    { "parameter": "level", "value": 2 }
                ],
                "inputParameters": "{\"level\": \"2\"}"
            }
        }))
        .unwrap();

        assert!(node.has_branches());
        assert_eq!(node.data.categories, vec!["low", "high"]);
        assert_eq!(
            node.data.category_conditions[1].parts(),
            Some(("level", "2".to_string()))
        );
        assert!(matches!(
            node.data.input_parameters,
            Some(InputParameters::Encoded(_))
        ));
    }

    #[test]
    fn test_condition_parts_skip_empty() {
        let cond = CategoryCondition {
            parameter: Some(String::new()),
            value: Some(json!("x")),
        };
        assert!(cond.parts().is_none());

        let cond = CategoryCondition {
            parameter: Some("p".into()),
            value: None,
        };
        assert!(cond.parts().is_none());
    }

    #[test]
    fn test_decode_structured_input() {
        let input: InputParameters = serde_json::from_value(json!({ "p": "1" })).unwrap();
        let map = input.decode().unwrap().unwrap();
        assert_eq!(map.get("p"), Some(&json!("1")));
    }

    #[test]
    fn test_decode_encoded_input() {
        let input = InputParameters::Encoded(r#"{"amount": 500}"#.to_string());
        let map = input.decode().unwrap().unwrap();
        assert_eq!(map.get("amount"), Some(&json!(500)));

        let empty = InputParameters::Encoded("  ".to_string());
        assert_eq!(empty.decode().unwrap(), None);
    }

    #[test]
    fn test_decode_malformed_input() {
        let input = InputParameters::Encoded("{not json".to_string());
        assert!(matches!(input.decode(), Err(ConditionError::Parse(_))));

        let input = InputParameters::Encoded("[1, 2]".to_string());
        match input.decode() {
            Err(ConditionError::Parse(msg)) => assert!(msg.contains("array")),
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_source_handle_parse() {
        assert_eq!(SourceHandle::parse(None), SourceHandle::Default);
        assert_eq!(SourceHandle::parse(Some("source")), SourceHandle::Default);
        assert_eq!(
            SourceHandle::parse(Some("source-category-3")),
            SourceHandle::Category(3)
        );
        assert_eq!(
            SourceHandle::parse(Some("source-category-x")),
            SourceHandle::Other("source-category-x".to_string())
        );
    }

    #[test]
    fn test_source_handle_requires_canonical_index() {
        for raw in ["source-category-01", "source-category-+1", "source-category-"] {
            assert_eq!(
                SourceHandle::parse(Some(raw)),
                SourceHandle::Other(raw.to_string()),
                "{} should not bind to a branch",
                raw
            );
        }
        assert_eq!(
            SourceHandle::parse(Some("source-category-0")),
            SourceHandle::Category(0)
        );
        assert_eq!(
            SourceHandle::parse(Some("source-category-10")),
            SourceHandle::Category(10)
        );
    }

    #[test]
    fn test_edge_for_category() {
        let edge = Edge::new("start_1", "auth_1").for_category(1);
        assert_eq!(edge.source_handle.as_deref(), Some("source-category-1"));
        assert_eq!(edge.handle(), SourceHandle::Category(1));
    }

    #[test]
    fn test_edge_deserialize_camel_case() {
        let edge: Edge = serde_json::from_value(json!({
            "id": "e1",
            "source": "a_1",
            "target": "b_1",
            "sourceHandle": "source-category-0"
        }))
        .unwrap();
        assert_eq!(edge.handle(), SourceHandle::Category(0));
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(value_as_text(&json!("abc")), "abc");
        assert_eq!(value_as_text(&json!(2)), "2");
        assert_eq!(value_as_text(&json!(true)), "true");
        assert_eq!(value_as_text(&json!(null)), "null");
    }

    #[test]
    fn test_float_text_matches_editor_rendering() {
        assert_eq!(value_as_text(&json!(500.0)), "500");
        assert_eq!(value_as_text(&json!(-3.0)), "-3");
        assert_eq!(value_as_text(&json!(2.5)), "2.5");
        assert_eq!(value_as_text(&json!(0.1)), "0.1");
        assert_eq!(value_as_text(&json!(-0.0)), "0");
        assert_eq!(value_as_text(&json!(1e21)), "1e+21");
        assert_eq!(value_as_text(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(value_as_text(&json!(123456789.0)), "123456789");
    }
}

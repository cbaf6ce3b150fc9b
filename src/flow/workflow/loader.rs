// SPDX-License-Identifier: MIT

//! Flow loader - JSON/YAML file loading and parsing

use super::types::FlowRecord;
use crate::engine::FlowError;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Loads flow records from `.json`, `.yaml` or `.yml` files
pub struct FlowLoader;

impl FlowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a flow record from a file.
    ///
    /// A bare `{nodes, edges}` document is accepted; its id is taken from the
    /// file stem.
    pub fn load_flow<P: AsRef<Path>>(&self, path: P) -> Result<FlowRecord, FlowError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FlowError::FlowNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let mut record = match extension(path).as_deref() {
            Some("json") => Self::parse_json(&content)?,
            Some("yaml") | Some("yml") => Self::parse_yaml(&content)?,
            other => {
                return Err(FlowError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        if record.id.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                record.id = stem.to_string();
            }
        }

        Ok(record)
    }

    /// Parse a flow record from a JSON string
    pub fn parse_json(content: &str) -> Result<FlowRecord, FlowError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a flow record from a YAML string
    pub fn parse_yaml(content: &str) -> Result<FlowRecord, FlowError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Flow files directly inside `dir`, sorted by path
    pub fn list_flows<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, FlowError> {
        let mut flows: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_flow_file(path))
            .collect();
        flows.sort();
        Ok(flows)
    }

    /// Find `<id>.json`, `<id>.yaml` or `<id>.yml` inside `dir`.
    ///
    /// Ids that would leave `dir` (separators, `..`, absolute paths) never match.
    pub fn find_flow<P: AsRef<Path>>(&self, dir: P, id: &str) -> Option<PathBuf> {
        if !is_plain_id(id) {
            log::warn!("Rejected flow id {:?}", id);
            return None;
        }
        ["json", "yaml", "yml"]
            .iter()
            .map(|ext| dir.as_ref().join(format!("{}.{}", id, ext)))
            .find(|path| path.exists())
    }
}

impl Default for FlowLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// A single file-name component
fn is_plain_id(id: &str) -> bool {
    if id.contains(['/', '\\']) || id.contains("..") {
        return false;
    }
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn is_flow_file(path: &Path) -> bool {
    matches!(extension(path).as_deref(), Some("json" | "yaml" | "yml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NodeKind, SourceHandle};
    use std::io::Write;

    #[test]
    fn test_parse_json_flow() {
        let json = r#"{
            "id": "flow_login",
            "name": "Login",
            "nodes": [
                { "id": "start_1", "data": { "label": "Start" } },
                { "id": "auth_1", "data": { "label": "Authenticate" } }
            ],
            "edges": [ { "source": "start_1", "target": "auth_1" } ]
        }"#;
        let record = FlowLoader::parse_json(json).unwrap();
        assert_eq!(record.name, "Login");
        assert_eq!(record.nodes.len(), 2);
        assert_eq!(record.nodes[1].kind, NodeKind::Auth);
    }

    #[test]
    fn test_parse_yaml_flow() {
        let yaml = r#"
name: Transfer
nodes:
  - id: start_1
    data:
      label: Start
      categories: [small, large]
      categoryConditions:
        - parameter: amount
          value: "small"
        - parameter: amount
          value: "large"
      inputParameters:
        amount: large
  - id: payment_1
    kind: payment
    data:
      label: Pay
edges:
  - source: start_1
    target: payment_1
    sourceHandle: source-category-1
"#;
        let record = FlowLoader::parse_yaml(yaml).unwrap();
        assert_eq!(record.name, "Transfer");
        assert_eq!(record.nodes[0].data.categories.len(), 2);
        assert_eq!(record.edges[0].handle(), SourceHandle::Category(1));
        assert_eq!(record.nodes[1].kind, NodeKind::Payment);
    }

    #[test]
    fn test_invalid_json_returns_error() {
        let result = FlowLoader::parse_json(r#"{"nodes": "oops"}"#);
        assert!(matches!(result, Err(FlowError::Json(_))));
    }

    #[test]
    fn test_invalid_yaml_returns_error() {
        let yaml = r#"
nodes:
  - invalid structure
"#;
        assert!(FlowLoader::parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_uses_file_stem_as_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"nodes": [{{"id": "auth_1", "data": {{"label": "Auth"}}}}], "edges": []}}"#
        )
        .unwrap();

        let record = FlowLoader::new().load_flow(&path).unwrap();
        assert_eq!(record.id, "checkout");
        assert_eq!(record.nodes.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = FlowLoader::new().load_flow("/definitely/not/here.json");
        assert!(matches!(result, Err(FlowError::FlowNotFound(_))));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        fs::write(&path, "nodes = []").unwrap();

        let result = FlowLoader::new().load_flow(&path);
        assert!(matches!(result, Err(FlowError::UnsupportedFormat(ext)) if ext == "toml"));
    }

    #[test]
    fn test_list_and_find_flows() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "nodes: []").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();

        let loader = FlowLoader::new();
        let flows = loader.list_flows(dir.path()).unwrap();
        let names: Vec<_> = flows
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.json", "b.yaml"]);

        assert!(loader.find_flow(dir.path(), "b").is_some());
        assert!(loader.find_flow(dir.path(), "notes").is_none());
    }

    #[test]
    fn test_find_flow_stays_inside_dir() {
        let root = tempfile::tempdir().unwrap();
        let flows = root.path().join("flows");
        fs::create_dir(&flows).unwrap();
        fs::write(root.path().join("secret.json"), "{}").unwrap();
        fs::write(flows.join("login.json"), "{}").unwrap();

        let loader = FlowLoader::new();
        let outside = root.path().join("secret");
        for id in [
            "../secret",
            "..\\secret",
            "..",
            "",
            "sub/login",
            outside.to_str().unwrap(),
        ] {
            assert!(loader.find_flow(&flows, id).is_none(), "id {:?}", id);
        }
        assert!(loader.find_flow(&flows, "login").is_some());
    }
}

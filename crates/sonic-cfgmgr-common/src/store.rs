//! Versioned configuration store abstraction.
//!
//! A configuration manager always sees two versions of the configuration
//! tree: the *current* (candidate) tree being committed and the *effective*
//! tree that was applied by the previous run. [`ConfigStore`] exposes both
//! through the same accessor pairs so that diffing logic never needs a live
//! store.
//!
//! Paths are space-delimited hierarchical keys, e.g.
//! `interfaces tunnel tun0 parameters ip ttl`. The empty path is the root.
//!
//! [`ConfigTree`] is the bundled implementation, backed by two JSON
//! documents:
//!
//! | JSON | meaning |
//! |------|---------|
//! | string / number / bool | leaf with a single value |
//! | array | leaf with multiple values |
//! | `null` or `{}` | valueless node (present, no value) |
//! | object | node with children |

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{CfgMgrError, CfgMgrResult};

/// Read access to the current and effective configuration trees.
pub trait ConfigStore {
    /// Returns true if the path exists in the current tree.
    fn exists(&self, path: &str) -> bool;

    /// Returns true if the path exists in the effective tree.
    fn exists_effective(&self, path: &str) -> bool;

    /// Single value at `path` in the current tree.
    fn value_at(&self, path: &str) -> Option<String>;

    /// Single value at `path` in the effective tree.
    fn effective_value_at(&self, path: &str) -> Option<String>;

    /// All values at a multi-valued `path` in the current tree.
    fn values_at(&self, path: &str) -> Vec<String>;

    /// All values at a multi-valued `path` in the effective tree.
    fn effective_values_at(&self, path: &str) -> Vec<String>;

    /// Names of the children of `path` in the current tree.
    fn child_names(&self, path: &str) -> Vec<String>;

    /// Names of the children of `path` in the effective tree.
    fn effective_child_names(&self, path: &str) -> Vec<String>;

    /// The current subtree rooted at `path`.
    fn subtree(&self, path: &str) -> Option<Value>;
}

/// Joins a base path and a relative path with a single space.
pub fn join_path(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{} {}", base, rel),
    }
}

/// Configuration store backed by two in-memory JSON documents.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    current: Value,
    effective: Value,
}

impl ConfigTree {
    /// Builds a store from already parsed trees.
    pub fn new(current: Value, effective: Value) -> Self {
        Self { current, effective }
    }

    /// Parses both trees from JSON text.
    pub fn from_json_str(current: &str, effective: &str) -> CfgMgrResult<Self> {
        let current = serde_json::from_str(current)
            .map_err(|e| CfgMgrError::config_store("current", e.to_string()))?;
        let effective = serde_json::from_str(effective)
            .map_err(|e| CfgMgrError::config_store("effective", e.to_string()))?;
        Ok(Self::new(current, effective))
    }

    /// Loads both trees from files.
    ///
    /// A missing effective file is an empty tree: nothing has been applied
    /// yet on a first commit.
    pub fn from_files(current: &Path, effective: &Path) -> CfgMgrResult<Self> {
        let current = read_tree(current)?;
        let effective = if effective.exists() {
            read_tree(effective)?
        } else {
            tracing::debug!(path = %effective.display(), "No effective config, using empty tree");
            Value::Object(Map::new())
        };
        Ok(Self::new(current, effective))
    }

    /// The raw current tree.
    pub fn current(&self) -> &Value {
        &self.current
    }

    /// The raw effective tree.
    pub fn effective(&self) -> &Value {
        &self.effective
    }
}

fn read_tree(path: &Path) -> CfgMgrResult<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| CfgMgrError::config_store(path.display().to_string(), e.to_string()))?;
    serde_json::from_str(&text)
        .map_err(|e| CfgMgrError::config_store(path.display().to_string(), e.to_string()))
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split_whitespace()
        .try_fold(root, |node, part| node.as_object()?.get(part))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn single_value(root: &Value, path: &str) -> Option<String> {
    lookup(root, path).and_then(scalar)
}

fn multi_values(root: &Value, path: &str) -> Vec<String> {
    match lookup(root, path) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(other) => scalar(other).into_iter().collect(),
        None => Vec::new(),
    }
}

fn children(root: &Value, path: &str) -> Vec<String> {
    match lookup(root, path) {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

impl ConfigStore for ConfigTree {
    fn exists(&self, path: &str) -> bool {
        lookup(&self.current, path).is_some()
    }

    fn exists_effective(&self, path: &str) -> bool {
        lookup(&self.effective, path).is_some()
    }

    fn value_at(&self, path: &str) -> Option<String> {
        single_value(&self.current, path)
    }

    fn effective_value_at(&self, path: &str) -> Option<String> {
        single_value(&self.effective, path)
    }

    fn values_at(&self, path: &str) -> Vec<String> {
        multi_values(&self.current, path)
    }

    fn effective_values_at(&self, path: &str) -> Vec<String> {
        multi_values(&self.effective, path)
    }

    fn child_names(&self, path: &str) -> Vec<String> {
        children(&self.current, path)
    }

    fn effective_child_names(&self, path: &str) -> Vec<String> {
        children(&self.effective, path)
    }

    fn subtree(&self, path: &str) -> Option<Value> {
        lookup(&self.current, path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> ConfigTree {
        ConfigTree::new(
            json!({
                "interfaces": {
                    "tunnel": {
                        "tun0": {
                            "encapsulation": "gre",
                            "mtu": 1400,
                            "address": ["10.0.0.1/30", "2001:db8::1/64"],
                            "disable": null,
                            "parameters": { "ip": { "ttl": "64" } }
                        }
                    }
                }
            }),
            json!({
                "interfaces": { "tunnel": { "tun0": { "encapsulation": "gre" } } }
            }),
        )
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("interfaces tunnel", "tun0"), "interfaces tunnel tun0");
        assert_eq!(join_path("", "tun0"), "tun0");
        assert_eq!(join_path("interfaces", ""), "interfaces");
    }

    #[test]
    fn test_exists_current_and_effective() {
        let t = tree();
        assert!(t.exists("interfaces tunnel tun0 mtu"));
        assert!(!t.exists_effective("interfaces tunnel tun0 mtu"));
        assert!(t.exists("interfaces tunnel tun0 disable"));
        assert!(t.exists(""));
        assert!(!t.exists("interfaces tunnel tun1"));
    }

    #[test]
    fn test_values() {
        let t = tree();
        assert_eq!(
            t.value_at("interfaces tunnel tun0 parameters ip ttl"),
            Some("64".to_string())
        );
        assert_eq!(t.value_at("interfaces tunnel tun0 mtu"), Some("1400".to_string()));
        // valueless node exists but carries no value
        assert_eq!(t.value_at("interfaces tunnel tun0 disable"), None);
        assert_eq!(
            t.values_at("interfaces tunnel tun0 address"),
            vec!["10.0.0.1/30", "2001:db8::1/64"]
        );
        assert_eq!(
            t.values_at("interfaces tunnel tun0 encapsulation"),
            vec!["gre"]
        );
        assert!(t.effective_values_at("interfaces tunnel tun0 address").is_empty());
    }

    #[test]
    fn test_children_and_subtree() {
        let t = tree();
        assert_eq!(t.child_names("interfaces tunnel"), vec!["tun0"]);
        assert_eq!(t.effective_child_names("interfaces tunnel"), vec!["tun0"]);
        assert!(t.child_names("interfaces tunnel tun0 mtu").is_empty());
        let sub = t.subtree("interfaces tunnel tun0 parameters").unwrap();
        assert_eq!(sub, json!({ "ip": { "ttl": "64" } }));
    }

    #[test]
    fn test_from_json_str_errors() {
        let err = ConfigTree::from_json_str("{", "{}").unwrap_err();
        assert!(matches!(err, CfgMgrError::ConfigStore { .. }));
    }

    #[test]
    fn test_from_files_missing_effective() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("current.json");
        fs::write(&current, r#"{"interfaces": {"tunnel": {"tun0": {}}}}"#).unwrap();

        let t = ConfigTree::from_files(&current, &dir.path().join("effective.json")).unwrap();
        assert!(t.exists("interfaces tunnel tun0"));
        assert!(!t.exists_effective("interfaces tunnel tun0"));
    }
}

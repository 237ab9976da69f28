//! Resource description metadata

use modelmeta_common::ModelNode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Schema of one resource type
///
/// Wraps the `read-resource-description` payload with `children` and
/// `access-control` already split off.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceDescription {
    #[serde(flatten)]
    node: Map<String, Value>,
    #[serde(skip)]
    recursive: bool,
}

impl ResourceDescription {
    /// Wrap a description payload; non-object payloads yield an empty description
    #[must_use]
    pub fn new(node: ModelNode, recursive: bool) -> Self {
        let node = match node {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { node, recursive }
    }

    /// Whether nested descriptions were fetched along with this one
    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Human readable description text
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.node.get("description").and_then(Value::as_str)
    }

    #[must_use]
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.node.get("attributes").and_then(Value::as_object)
    }

    #[must_use]
    pub fn operations(&self) -> Option<&Map<String, Value>> {
        self.node.get("operations").and_then(Value::as_object)
    }

    /// Attribute names in payload order
    #[must_use]
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes()
            .map(|attrs| attrs.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations()
            .map(|ops| ops.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.node.get(name)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let description = ResourceDescription::new(
            json!({
                "description": "The logging subsystem",
                "attributes": {"add-logging-api-dependencies": {"type": "BOOLEAN"}},
                "operations": {"add": {}, "remove": {}},
            }),
            false,
        );
        assert_eq!(description.description(), Some("The logging subsystem"));
        assert_eq!(description.attribute_names(), vec!["add-logging-api-dependencies"]);
        assert_eq!(description.operation_names().len(), 2);
        assert!(!description.is_recursive());
    }

    #[test]
    fn test_non_object_payload() {
        let description = ResourceDescription::new(json!("nope"), true);
        assert!(description.as_map().is_empty());
        assert!(description.attribute_names().is_empty());
        assert!(description.is_recursive());
    }
}

//! Security context metadata

use modelmeta_common::ModelNode;
use serde::Serialize;
use serde_json::{Map, Value};

/// Permissions of the current user on one resource
///
/// Built from an `access-control` entry:
///
/// ```text
/// { "read": true, "write": false,
///   "attributes": { "<name>": { "read": true, "write": false } },
///   "operations": { "<name>": { "execute": true } } }
/// ```
///
/// Missing flags count as denied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityContext {
    #[serde(flatten)]
    node: Map<String, Value>,
    #[serde(skip)]
    recursive: bool,
}

impl SecurityContext {
    #[must_use]
    pub fn new(node: ModelNode, recursive: bool) -> Self {
        let node = match node {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { node, recursive }
    }

    #[must_use]
    pub const fn is_recursive(&self) -> bool {
        self.recursive
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        flag(&self.node, "read")
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        flag(&self.node, "write")
    }

    /// Attribute level read permission, falling back to the resource level
    #[must_use]
    pub fn is_readable_attribute(&self, attribute: &str) -> bool {
        self.member("attributes", attribute)
            .map_or_else(|| self.is_readable(), |a| flag(a, "read"))
    }

    /// Attribute level write permission, falling back to the resource level
    #[must_use]
    pub fn is_writable_attribute(&self, attribute: &str) -> bool {
        self.member("attributes", attribute)
            .map_or_else(|| self.is_writable(), |a| flag(a, "write"))
    }

    #[must_use]
    pub fn is_executable(&self, operation: &str) -> bool {
        self.member("operations", operation)
            .is_some_and(|o| flag(o, "execute"))
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.node
    }

    fn member(&self, group: &str, name: &str) -> Option<&Map<String, Value>> {
        self.node
            .get(group)
            .and_then(|g| g.get(name))
            .and_then(Value::as_object)
    }
}

fn flag(node: &Map<String, Value>, name: &str) -> bool {
    node.get(name).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> SecurityContext {
        SecurityContext::new(
            json!({
                "read": true,
                "write": false,
                "attributes": {
                    "password": {"read": false, "write": false},
                    "min-pool-size": {"read": true, "write": true},
                },
                "operations": {
                    "flush-all-connection-in-pool": {"execute": true},
                    "remove": {"execute": false},
                },
            }),
            false,
        )
    }

    #[test]
    fn test_resource_flags() {
        let context = context();
        assert!(context.is_readable());
        assert!(!context.is_writable());
    }

    #[test]
    fn test_attribute_flags() {
        let context = context();
        assert!(!context.is_readable_attribute("password"));
        assert!(context.is_writable_attribute("min-pool-size"));
        assert!(context.is_readable_attribute("jndi-name"));
        assert!(!context.is_writable_attribute("jndi-name"));
    }

    #[test]
    fn test_operation_flags() {
        let context = context();
        assert!(context.is_executable("flush-all-connection-in-pool"));
        assert!(!context.is_executable("remove"));
        assert!(!context.is_executable("undefined"));
    }

    #[test]
    fn test_empty_denies() {
        let context = SecurityContext::new(json!(null), false);
        assert!(!context.is_readable());
        assert!(!context.is_executable("add"));
    }
}

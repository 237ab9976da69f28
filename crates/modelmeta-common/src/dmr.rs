//! Management operation model
//!
//! Operations are addressed by a [`ResourceAddress`] and carry named
//! parameters. Several operations can be sent as one [`Composite`]; the
//! server answers with one [`StepResult`] per step, in order.
//!
//! Payloads are plain JSON trees ([`ModelNode`]) in the shape the
//! management endpoint produces:
//!
//! ```text
//! { "outcome": "success", "result": { ... } }
//! { "outcome": "failed", "failure-description": "..." }
//! ```

use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Untyped payload of a management response
pub type ModelNode = Value;

/// Well-known operation, parameter and attribute names
pub mod names {
    pub const ACCESS_CONTROL: &str = "access-control";
    pub const ADDRESS: &str = "address";
    pub const CHILD_TYPE: &str = "child-type";
    pub const CHILDREN: &str = "children";
    pub const COMBINED_DESCRIPTIONS: &str = "combined-descriptions";
    pub const COMPOSITE: &str = "composite";
    pub const DEFAULT: &str = "default";
    pub const EXCEPTIONS: &str = "exceptions";
    pub const FAILED: &str = "failed";
    pub const FAILURE_DESCRIPTION: &str = "failure-description";
    pub const HOST: &str = "host";
    pub const INCLUDE_SINGLETONS: &str = "include-singletons";
    pub const MODEL_DESCRIPTION: &str = "model-description";
    pub const OPERATION: &str = "operation";
    pub const OPERATIONS: &str = "operations";
    pub const OUTCOME: &str = "outcome";
    pub const READ_CHILDREN_NAMES_OPERATION: &str = "read-children-names";
    pub const READ_CHILDREN_TYPES_OPERATION: &str = "read-children-types";
    pub const READ_RESOURCE_DESCRIPTION_OPERATION: &str = "read-resource-description";
    pub const RECURSIVE_DEPTH: &str = "recursive-depth";
    pub const RESULT: &str = "result";
    pub const SERVER: &str = "server";
    pub const STEPS: &str = "steps";
    pub const SUCCESS: &str = "success";
    pub const TRIM_DESCRIPTIONS: &str = "trim-descriptions";
}

/// Concrete address of a resource in the management tree
///
/// Serialized as `[{"subsystem": "logging"}, {"logger": "com.acme"}]`.
/// Values may be `*` but never placeholders.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceAddress(Vec<(String, String)>);

impl ResourceAddress {
    /// The root address
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Create from key/value pairs
    #[must_use]
    pub const fn new(segments: Vec<(String, String)>) -> Self {
        Self(segments)
    }

    /// Return a copy with one more segment
    #[must_use]
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push((key.into(), value.into()));
        Self(segments)
    }

    /// Key/value pairs in order
    #[must_use]
    pub fn segments(&self) -> &[(String, String)] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Address without its last segment (root stays root)
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.0.clone();
        segments.pop();
        Self(segments)
    }

    /// Decode the wire form `[{"key": "value"}, ...]`
    pub fn from_model_node(node: &ModelNode) -> DispatchResult<Self> {
        let Value::Array(items) = node else {
            return Err(DispatchError::decode(format!(
                "address must be a list, got {node}"
            )));
        };
        let mut segments = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(pair) = item else {
                return Err(DispatchError::decode(format!(
                    "address segment must be an object, got {item}"
                )));
            };
            for (key, value) in pair {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                segments.push((key.clone(), value));
            }
        }
        Ok(Self(segments))
    }

    /// Encode to the wire form
    #[must_use]
    pub fn to_model_node(&self) -> ModelNode {
        Value::Array(
            self.0
                .iter()
                .map(|(k, v)| {
                    let mut pair = Map::new();
                    pair.insert(k.clone(), Value::String(v.clone()));
                    Value::Object(pair)
                })
                .collect(),
        )
    }
}

impl fmt::Debug for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceAddress({self})")
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (key, value) in &self.0 {
            write!(f, "/{key}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for ResourceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_model_node().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = ModelNode::deserialize(deserializer)?;
        Self::from_model_node(&node).map_err(serde::de::Error::custom)
    }
}

/// A single management operation
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: String,
    address: ResourceAddress,
    params: Map<String, Value>,
}

impl Operation {
    /// Create an operation without parameters
    pub fn new(address: ResourceAddress, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address,
            params: Map::new(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn address(&self) -> &ResourceAddress {
        &self.address
    }

    #[must_use]
    pub const fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    /// Look up a parameter
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Encode as `{"operation": .., "address": [..], <params>}`
    #[must_use]
    pub fn to_model_node(&self) -> ModelNode {
        let mut node = Map::new();
        node.insert(names::OPERATION.into(), Value::String(self.name.clone()));
        node.insert(names::ADDRESS.into(), self.address.to_model_node());
        for (key, value) in &self.params {
            node.insert(key.clone(), value.clone());
        }
        Value::Object(node)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.name)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => format!("{k}={s}"),
                    other => format!("{k}={other}"),
                })
                .collect();
            write!(f, "({})", params.join(","))?;
        }
        Ok(())
    }
}

/// Several operations sent in one round trip
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composite {
    steps: Vec<Operation>,
}

impl Composite {
    #[must_use]
    pub const fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step
    pub fn add(&mut self, operation: Operation) -> &mut Self {
        self.steps.push(operation);
        self
    }

    #[must_use]
    pub fn steps(&self) -> &[Operation] {
        &self.steps
    }

    /// Step at `index`
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Operation> {
        self.steps.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Encode as a `composite` operation against the root
    #[must_use]
    pub fn to_model_node(&self) -> ModelNode {
        let mut node = Map::new();
        node.insert(names::OPERATION.into(), Value::String(names::COMPOSITE.into()));
        node.insert(names::ADDRESS.into(), Value::Array(Vec::new()));
        node.insert(
            names::STEPS.into(),
            Value::Array(self.steps.iter().map(Operation::to_model_node).collect()),
        );
        Value::Object(node)
    }
}

impl From<Vec<Operation>> for Composite {
    fn from(steps: Vec<Operation>) -> Self {
        Self { steps }
    }
}

/// Outcome of one operation or composite step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
}

impl Outcome {
    /// Read the `outcome` attribute; anything but `success` counts as failure
    #[must_use]
    pub fn of(node: &ModelNode) -> Self {
        match node.get(names::OUTCOME).and_then(Value::as_str) {
            Some(names::SUCCESS) => Self::Success,
            _ => Self::Failed,
        }
    }
}

/// Result of one step in a composite response
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub outcome: Outcome,
    pub result: ModelNode,
    pub failure_description: Option<String>,
}

impl StepResult {
    /// A successful step with the given payload
    #[must_use]
    pub const fn success(result: ModelNode) -> Self {
        Self {
            outcome: Outcome::Success,
            result,
            failure_description: None,
        }
    }

    /// A failed step
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            result: Value::Null,
            failure_description: Some(description.into()),
        }
    }

    /// Decode `{"outcome": .., "result": .., "failure-description": ..}`
    #[must_use]
    pub fn from_model_node(node: &ModelNode) -> Self {
        let failure_description = node.get(names::FAILURE_DESCRIPTION).map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        Self {
            outcome: Outcome::of(node),
            result: node.get(names::RESULT).cloned().unwrap_or(Value::Null),
            failure_description,
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Ordered step results of a composite, one per step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeResult {
    steps: Vec<StepResult>,
}

impl CompositeResult {
    #[must_use]
    pub const fn new(steps: Vec<StepResult>) -> Self {
        Self { steps }
    }

    /// Decode a composite response
    ///
    /// Steps come back as `step-1`, `step-2`, ... inside `result`; they are
    /// returned ordered by their number regardless of map ordering.
    pub fn from_response(response: &ModelNode) -> DispatchResult<Self> {
        let Some(Value::Object(result)) = response.get(names::RESULT) else {
            return Err(DispatchError::decode("composite response without result"));
        };
        let mut numbered = Vec::with_capacity(result.len());
        for (key, step) in result {
            let Some(number) = key
                .strip_prefix("step-")
                .and_then(|n| n.parse::<usize>().ok())
            else {
                continue;
            };
            numbered.push((number, StepResult::from_model_node(step)));
        }
        numbered.sort_by_key(|(number, _)| *number);
        Ok(Self {
            steps: numbered.into_iter().map(|(_, step)| step).collect(),
        })
    }

    #[must_use]
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&StepResult> {
        self.steps.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

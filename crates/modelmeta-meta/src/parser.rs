//! `read-resource-description` response parsing
//!
//! Each composite step yields either a single description (for a concrete
//! address) or a list of `{address, outcome, result}` items (for wildcard
//! addresses). Every description may carry:
//!
//! - `access-control` with a `default` entry for the resource itself and
//!   `exceptions`, each keyed by its own `address`
//! - `children` with nested descriptions under
//!   `children.<type>.model-description.<name>` when fetched recursively
//!
//! Descriptions are stored without `children` and `access-control`.

use modelmeta_common::dmr::names;
use modelmeta_common::{Composite, CompositeResult, ModelNode, Operation, ResourceAddress};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::{trace, warn};

use crate::description::ResourceDescription;
use crate::error::ParseError;
use crate::security::SecurityContext;

/// Metadata parsed for one concrete address
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RrdEntry {
    pub resource_description: Option<ResourceDescription>,
    pub security_context: Option<SecurityContext>,
}

/// Flat `address -> metadata` map accumulated while parsing
///
/// Within one result the first value seen for an address wins, matching
/// the registries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RrdResult {
    entries: BTreeMap<ResourceAddress, RrdEntry>,
}

impl RrdResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource_description(
        &mut self,
        address: ResourceAddress,
        description: ResourceDescription,
    ) {
        let entry = self.entries.entry(address).or_default();
        if entry.resource_description.is_none() {
            entry.resource_description = Some(description);
        }
    }

    pub fn add_security_context(&mut self, address: ResourceAddress, context: SecurityContext) {
        let entry = self.entries.entry(address).or_default();
        if entry.security_context.is_none() {
            entry.security_context = Some(context);
        }
    }

    /// Fold another result into this one, keeping existing values
    pub fn merge(&mut self, other: Self) {
        for (address, entry) in other.entries {
            match self.entries.entry(address) {
                Entry::Vacant(vacant) => {
                    vacant.insert(entry);
                }
                Entry::Occupied(mut occupied) => {
                    let existing = occupied.get_mut();
                    if existing.resource_description.is_none() {
                        existing.resource_description = entry.resource_description;
                    }
                    if existing.security_context.is_none() {
                        existing.security_context = entry.security_context;
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, address: &ResourceAddress) -> Option<&RrdEntry> {
        self.entries.get(address)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceAddress, &RrdEntry)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for RrdResult {
    type Item = (ResourceAddress, RrdEntry);
    type IntoIter = std::collections::btree_map::IntoIter<ResourceAddress, RrdEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Parser for composite `read-resource-description` responses
pub struct RrdParser;

/// What one step asked for
struct StepScope<'a> {
    operation: &'a Operation,
    recursive: bool,
    descriptions: bool,
}

impl RrdParser {
    /// Parse the response to `composite` into `result`
    ///
    /// The response must have one step per operation. A failed step is an
    /// error: without it later steps could not be matched to their
    /// operations.
    pub fn parse(
        composite: &Composite,
        response: &CompositeResult,
        result: &mut RrdResult,
    ) -> Result<(), ParseError> {
        if composite.len() != response.len() {
            return Err(ParseError::StepCountMismatch {
                expected: composite.len(),
                actual: response.len(),
            });
        }

        for (index, (operation, step)) in composite.steps().iter().zip(response.steps()).enumerate()
        {
            if step.is_failure() {
                return Err(ParseError::StepFailed {
                    index,
                    operation: operation.to_string(),
                    description: step
                        .failure_description
                        .clone()
                        .unwrap_or_else(|| "no failure description".to_string()),
                });
            }
            let scope = StepScope {
                operation,
                recursive: operation.get_param(names::RECURSIVE_DEPTH).is_some(),
                descriptions: operation.get_param(names::ACCESS_CONTROL)
                    != Some(&Value::String(names::TRIM_DESCRIPTIONS.to_string())),
            };
            match &step.result {
                Value::Array(items) => {
                    for item in items {
                        Self::parse_item(&scope, item, result)?;
                    }
                }
                Value::Object(_) => {
                    Self::parse_description(
                        &scope,
                        operation.address().clone(),
                        &step.result,
                        result,
                    )?;
                }
                other => {
                    return Err(ParseError::unexpected(
                        operation,
                        format!("expected object or list, got {other}"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn parse_item(
        scope: &StepScope<'_>,
        item: &ModelNode,
        result: &mut RrdResult,
    ) -> Result<(), ParseError> {
        let address = item
            .get(names::ADDRESS)
            .ok_or_else(|| ParseError::unexpected(scope.operation, "list item without address"))
            .and_then(|a| {
                ResourceAddress::from_model_node(a)
                    .map_err(|e| ParseError::unexpected(scope.operation, e.to_string()))
            })?;
        if item.get(names::OUTCOME).and_then(Value::as_str) == Some(names::FAILED) {
            warn!(
                operation = %scope.operation,
                address = %address,
                "Skipping failed item in description list"
            );
            return Ok(());
        }
        let Some(payload) = item.get(names::RESULT) else {
            return Err(ParseError::unexpected(
                scope.operation,
                format!("list item {address} without result"),
            ));
        };
        let address = correct_address(scope.operation.address(), address);
        Self::parse_description(scope, address, payload, result)
    }

    fn parse_description(
        scope: &StepScope<'_>,
        address: ResourceAddress,
        payload: &ModelNode,
        result: &mut RrdResult,
    ) -> Result<(), ParseError> {
        let Value::Object(node) = payload else {
            return Err(ParseError::unexpected(
                scope.operation,
                format!("description of {address} is not an object"),
            ));
        };
        let mut node = node.clone();
        let access_control = node.remove(names::ACCESS_CONTROL);
        let children = node.remove(names::CHILDREN);

        if let Some(access_control) = access_control {
            Self::parse_access_control(scope, &address, &access_control, result)?;
        }

        if let Some(Value::Object(children)) = children {
            for (child_type, child) in children {
                let Some(Value::Object(nested)) = child.get(names::MODEL_DESCRIPTION) else {
                    continue;
                };
                for (child_name, description) in nested {
                    let child_address = address.add(child_type.as_str(), child_name.as_str());
                    Self::parse_description(scope, child_address, description, result)?;
                }
            }
        }

        if scope.descriptions {
            trace!(address = %address, recursive = scope.recursive, "Parsed resource description");
            result.add_resource_description(
                address,
                ResourceDescription::new(Value::Object(node), scope.recursive),
            );
        }
        Ok(())
    }

    fn parse_access_control(
        scope: &StepScope<'_>,
        address: &ResourceAddress,
        access_control: &ModelNode,
        result: &mut RrdResult,
    ) -> Result<(), ParseError> {
        if let Some(default) = access_control.get(names::DEFAULT) {
            trace!(address = %address, "Parsed security context");
            result.add_security_context(
                address.clone(),
                SecurityContext::new(default.clone(), scope.recursive),
            );
        }

        let Some(Value::Object(exceptions)) = access_control.get(names::EXCEPTIONS) else {
            return Ok(());
        };
        for exception in exceptions.values() {
            let Value::Object(exception) = exception else {
                continue;
            };
            let Some(exception_address) = exception.get(names::ADDRESS) else {
                return Err(ParseError::unexpected(
                    scope.operation,
                    format!("access control exception under {address} without address"),
                ));
            };
            let exception_address = ResourceAddress::from_model_node(exception_address)
                .map_err(|e| ParseError::unexpected(scope.operation, e.to_string()))?;
            let exception_address = correct_address(scope.operation.address(), exception_address);
            let mut node = exception.clone();
            node.remove(names::ADDRESS);
            trace!(address = %exception_address, "Parsed security context exception");
            result.add_security_context(
                exception_address,
                SecurityContext::new(Value::Object(node), scope.recursive),
            );
        }
        Ok(())
    }
}

/// Restore the `host` / `server` prefix of the requested address
///
/// Addresses in responses from a managed server omit the `host=..` and
/// `server=..` segments the request was routed through. Missing prefix
/// segments are taken from the operation address; segments already present
/// keep their own (possibly concrete) values.
fn correct_address(operation: &ResourceAddress, address: ResourceAddress) -> ResourceAddress {
    let prefix: Vec<&(String, String)> = operation
        .segments()
        .iter()
        .take_while(|(key, _)| key == names::HOST || key == names::SERVER)
        .collect();
    if prefix.is_empty() {
        return address;
    }
    let present = address
        .segments()
        .iter()
        .zip(&prefix)
        .take_while(|((key, _), (prefix_key, _))| key == prefix_key)
        .count();
    if present == prefix.len() {
        return address;
    }
    let segments = address.segments();
    let corrected: Vec<(String, String)> = segments[..present]
        .iter()
        .chain(prefix[present..].iter().copied())
        .chain(&segments[present..])
        .cloned()
        .collect();
    ResourceAddress::new(corrected)
}

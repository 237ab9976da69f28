//! Model tree traversal
//!
//! A concrete node (`/subsystem=logging`) is expanded with
//! `read-children-types`, which yields one wildcard child per type
//! (`/subsystem=logging/logger=*`). A wildcard node is expanded with
//! `read-children-names` on its parent, which yields the concrete
//! instances (`/subsystem=logging/logger=com.acme`).
//!
//! ```text
//! /            ─types─►  /subsystem=*
//! /subsystem=* ─names─►  /subsystem=ee, /subsystem=logging, ...
//! ```
//!
//! Nodes are address templates; the wire address is only built when a node
//! is queried. Exclusions match the canonical template text.

use futures::future::{BoxFuture, join_all};
use modelmeta_common::dmr::names;
use modelmeta_common::{Dispatcher, Operation};
use modelmeta_template::{AddressTemplate, Segment, TemplateResult, WILDCARD};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{TraverseContext, TraverseContinuation, TraverseState};

bitflags::bitflags! {
    /// Options of a traversal
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TraverseFlags: u8 {
        /// Ask for singleton children (`core-service=management`) directly
        const INCLUDE_SINGLETONS = 0b0000_0001;
        /// Also visit wildcard addresses (`/subsystem=*`)
        const WILDCARD_RESOURCES = 0b0000_0010;
    }
}

/// Walks the management model through a [`Dispatcher`]
pub struct ModelTree {
    dispatcher: Arc<dyn Dispatcher>,
}

/// Everything fixed for the duration of one traversal
struct Walk<'a, F> {
    continuation: &'a TraverseContinuation,
    exclude: &'a [String],
    flags: TraverseFlags,
    visit: &'a F,
    context: &'a TraverseContext,
}

impl ModelTree {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Walk the model below `start`
    ///
    /// The continuation is set running when this is called, before the
    /// returned future is first polled; a `stop()` after the call aborts the
    /// walk before any query. Fails if `start` still contains placeholders.
    ///
    /// `visit` is called with every fully qualified resource found below
    /// `start` (and wildcard addresses with
    /// [`TraverseFlags::WILDCARD_RESOURCES`]) plus the running context.
    /// Addresses whose canonical text starts with one of `exclude` are
    /// neither visited nor descended into. The returned context ends as
    /// [`TraverseState::Aborted`] when the continuation was stopped,
    /// [`TraverseState::Failed`] when a node could not be read and
    /// [`TraverseState::Completed`] otherwise. The continuation is stopped
    /// when the walk returns.
    pub fn traverse<'a, F>(
        &'a self,
        continuation: &'a TraverseContinuation,
        start: &AddressTemplate,
        exclude: &'a [String],
        flags: TraverseFlags,
        visit: F,
    ) -> TemplateResult<impl Future<Output = TraverseContext> + Send + 'a>
    where
        F: Fn(&AddressTemplate, &TraverseContext) + Send + Sync + 'a,
    {
        children_operation(start, flags)?;
        let start = start.clone();
        continuation.start();

        Ok(async move {
            let context = TraverseContext::new();
            context.set_state(TraverseState::Running);
            let walk = Walk {
                continuation,
                exclude,
                flags,
                visit: &visit,
                context: &context,
            };

            if is_excluded(&start, exclude) {
                debug!(start = %start, "Start address is excluded");
            } else {
                self.node(start.clone(), &walk).await;
            }

            let state = if !continuation.is_running() {
                TraverseState::Aborted
            } else if context.has_failures() {
                TraverseState::Failed
            } else {
                TraverseState::Completed
            };
            continuation.stop();
            context.set_state(state);
            info!(
                start = %start,
                state = %state,
                processed = context.processed(),
                accepted = context.accepted(),
                "Traversal finished"
            );
            context
        })
    }

    fn node<'a, F>(&'a self, address: AddressTemplate, walk: &'a Walk<'a, F>) -> BoxFuture<'a, ()>
    where
        F: Fn(&AddressTemplate, &TraverseContext) + Send + Sync,
    {
        Box::pin(async move {
            if !walk.continuation.is_running() {
                return;
            }

            let operation = match children_operation(&address, walk.flags) {
                Ok(operation) => operation,
                Err(e) => {
                    warn!(address = %address, error = %e, "Skipping node without wire address");
                    return;
                }
            };
            let result = self.dispatcher.execute(&operation).await;
            if !walk.continuation.is_running() {
                debug!(address = %address, "Traversal stopped, discarding children");
                return;
            }

            let children = match result.map(|node| child_addresses(&address, &node)) {
                Ok(Some(children)) => children,
                Ok(None) => {
                    warn!(address = %address, operation = %operation, "Unexpected children payload");
                    walk.context.record_failure(address.to_string(), operation);
                    return;
                }
                Err(e) => {
                    warn!(address = %address, operation = %operation, error = %e, "Failed to read children");
                    walk.context.record_failure(address.to_string(), operation);
                    return;
                }
            };
            walk.context.record_processed();

            let mut descend = Vec::with_capacity(children.len());
            for child in children {
                if is_excluded(&child, walk.exclude) {
                    debug!(address = %child, "Skipping excluded address");
                    continue;
                }
                if child.is_fully_qualified() || walk.flags.contains(TraverseFlags::WILDCARD_RESOURCES) {
                    walk.context.record_accepted();
                    (walk.visit)(&child, walk.context);
                }
                descend.push(self.node(child, walk));
            }
            join_all(descend).await;
        })
    }
}

/// Key of the last segment when it is a wildcard
fn wildcard_key(address: &AddressTemplate) -> Option<&str> {
    address.last().filter(|s| s.is_wildcard()).and_then(Segment::key)
}

/// `read-children-names` on the parent of a wildcard node, otherwise
/// `read-children-types` on the node itself
fn children_operation(address: &AddressTemplate, flags: TraverseFlags) -> TemplateResult<Operation> {
    if let Some(key) = wildcard_key(address) {
        let parent = address.parent().to_resource_address()?;
        return Ok(Operation::new(parent, names::READ_CHILDREN_NAMES_OPERATION)
            .param(names::CHILD_TYPE, key));
    }
    let operation = Operation::new(address.to_resource_address()?, names::READ_CHILDREN_TYPES_OPERATION);
    if flags.contains(TraverseFlags::INCLUDE_SINGLETONS) {
        Ok(operation.param(names::INCLUDE_SINGLETONS, true))
    } else {
        Ok(operation)
    }
}

/// Child addresses listed in a children payload
///
/// Below a wildcard node the entries are instance names. Otherwise they are
/// child types, or `type=name` singletons when singletons were requested.
/// Entries that cannot be written as a template segment are skipped.
fn child_addresses(address: &AddressTemplate, node: &Value) -> Option<Vec<AddressTemplate>> {
    let entries = node.as_array()?.iter().filter_map(Value::as_str);
    let wildcard = wildcard_key(address);
    let parent = if wildcard.is_some() {
        address.parent()
    } else {
        address.clone()
    };
    let children = entries
        .filter_map(|entry| {
            let segment = match wildcard {
                Some(key) => Segment::new(key, entry),
                None => match entry.split_once('=') {
                    Some((key, name)) => Segment::new(key, name),
                    None => Segment::new(entry, WILDCARD),
                },
            };
            match segment {
                Ok(segment) => Some(parent.append_segment(segment)),
                Err(e) => {
                    warn!(address = %address, entry, error = %e, "Skipping child entry");
                    None
                }
            }
        })
        .collect();
    Some(children)
}

fn is_excluded(address: &AddressTemplate, exclude: &[String]) -> bool {
    exclude.iter().any(|prefix| address.as_str().starts_with(prefix.as_str()))
}

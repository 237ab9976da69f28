//! Transport contract
//!
//! The metadata layer never talks HTTP itself; it hands operations to a
//! [`Dispatcher`] and gets parsed payloads back.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dmr::{Composite, CompositeResult, ModelNode, Operation};
use crate::error::DispatchResult;

/// Executes management operations
///
/// `execute` returns the `result` payload of a successful operation; a
/// failed outcome is a [`DispatchError::Failed`](crate::DispatchError::Failed).
/// `execute_composite` returns one [`StepResult`](crate::StepResult) per
/// step, in request order, each independently markable as failed.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Dispatcher name for logging
    fn name(&self) -> &str;

    /// Execute a single operation
    async fn execute(&self, operation: &Operation) -> DispatchResult<ModelNode>;

    /// Execute several operations in one round trip
    async fn execute_composite(&self, composite: &Composite) -> DispatchResult<CompositeResult>;
}

#[async_trait]
impl<D: Dispatcher + ?Sized> Dispatcher for Arc<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn execute(&self, operation: &Operation) -> DispatchResult<ModelNode> {
        (**self).execute(operation).await
    }

    async fn execute_composite(&self, composite: &Composite) -> DispatchResult<CompositeResult> {
        (**self).execute_composite(composite).await
    }
}

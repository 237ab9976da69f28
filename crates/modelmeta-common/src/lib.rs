//! modelmeta Common - Shared types and utilities
//!
//! This crate provides the management operation model (operations,
//! composites and their results), the [`Dispatcher`] contract every
//! transport implements, configuration and the dispatch error type.

pub mod config;
pub mod dispatch;
pub mod dmr;
pub mod error;

pub use config::MetaConfig;
pub use dispatch::Dispatcher;
pub use dmr::{
    Composite, CompositeResult, ModelNode, Operation, Outcome, ResourceAddress, StepResult,
};
pub use error::{DispatchError, DispatchResult};

//! modelmeta Tree - Walking the live management model
//!
//! [`ModelTree::traverse`] starts at an address and descends through child
//! types and child names, calling a visitor for every resource it finds.
//! Children of a node are queried concurrently; a failing node is recorded
//! in the [`TraverseContext`] without stopping its siblings. A shared
//! [`TraverseContinuation`] stops the walk cooperatively.

pub mod context;
pub mod tree;

pub use context::{TraverseContext, TraverseContinuation, TraverseState};
pub use tree::{ModelTree, TraverseFlags};

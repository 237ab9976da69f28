//! Traversal state shared between concurrent node visits

use modelmeta_common::Operation;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Cooperative stop signal for a running traversal
///
/// Created running, and set running again by every traversal it is passed
/// to. [`stop`](Self::stop) makes the traversal skip every query not yet
/// issued and discard the results of queries in flight.
#[derive(Debug)]
pub struct TraverseContinuation {
    running: AtomicBool,
}

impl Default for TraverseContinuation {
    fn default() -> Self {
        Self::new()
    }
}

impl TraverseContinuation {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
        }
    }

    pub(crate) fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseState {
    Idle,
    Running,
    Completed,
    /// Stopped through the continuation
    Aborted,
    /// Finished with at least one failed node
    Failed,
}

impl fmt::Display for TraverseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Counters and failures collected during a traversal
#[derive(Debug)]
pub struct TraverseContext {
    processed: AtomicUsize,
    accepted: AtomicUsize,
    failed: Mutex<BTreeMap<String, Operation>>,
    state: Mutex<TraverseState>,
}

impl Default for TraverseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TraverseContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            processed: AtomicUsize::new(0),
            accepted: AtomicUsize::new(0),
            failed: Mutex::new(BTreeMap::new()),
            state: Mutex::new(TraverseState::Idle),
        }
    }

    /// Nodes whose children were read
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    /// Resources passed to the visitor
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Failed nodes by address, with the operation that failed
    #[must_use]
    pub fn failed(&self) -> BTreeMap<String, Operation> {
        self.failed.lock().clone()
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.lock().is_empty()
    }

    #[must_use]
    pub fn state(&self) -> TraverseState {
        *self.state.lock()
    }

    /// Nothing processed, accepted or failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processed() == 0 && self.accepted() == 0 && !self.has_failures()
    }

    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self, address: String, operation: Operation) {
        self.failed.lock().insert(address, operation);
    }

    pub(crate) fn set_state(&self, state: TraverseState) {
        *self.state.lock() = state;
    }
}

//! Tasks
//!
//! One task per schedulable object, (re)created wholesale by the builder
//! whenever the graph structure changes. Baseline fields are fixed per
//! build; the live fields are reset from them at the start of every step.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::graph::node::{GraphNode, NodeId};

/// The scheduler's per-object unit of work.
///
/// A task becomes ready exactly when `dirty` is set and `nb_dirty_inputs`
/// reaches zero. The invariant `nb_dirty_inputs > 0 => dirty` holds
/// throughout a step.
///
/// The live fields are atomics: a task's counter is only ever decremented
/// by the single thread finishing its upstream task, but increments from
/// deferred propagation can land from any thread, and Rust requires
/// data-race freedom regardless of the protocol's ownership argument.
pub struct Task {
    /// The object this task evaluates. Owned by the document; the task
    /// only keeps it alive across the build.
    pub node: Arc<dyn GraphNode>,

    /// Indices of the tasks to notify when this one completes.
    pub outputs: SmallVec<[usize; 4]>,

    /// True if evaluation must happen on the main worker only.
    pub restrict_to_main_thread: bool,

    /// Baseline dependency count for a fresh step, computed once per build.
    pub nb_dirty_at_start: u32,

    /// Baseline dirty flag for a fresh step, computed once per build.
    pub dirty_at_start: bool,

    /// Live count of unmet dirty inputs this step.
    pub nb_dirty_inputs: AtomicU32,

    /// Live dirty flag this step.
    pub dirty: AtomicBool,
}

impl Task {
    pub fn new(node: Arc<dyn GraphNode>) -> Self {
        let restrict_to_main_thread = node.update_on_main_thread();
        Self {
            node,
            outputs: SmallVec::new(),
            restrict_to_main_thread,
            nb_dirty_at_start: 0,
            dirty_at_start: false,
            nb_dirty_inputs: AtomicU32::new(0),
            dirty: AtomicBool::new(false),
        }
    }

    /// The ID of the wrapped object.
    pub fn node_id(&self) -> NodeId {
        self.node.id()
    }

    /// Reset the live fields from the baseline.
    pub fn reset(&self) {
        self.nb_dirty_inputs
            .store(self.nb_dirty_at_start, Ordering::SeqCst);
        self.dirty.store(self.dirty_at_start, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn dirty_input_count(&self) -> u32 {
        self.nb_dirty_inputs.load(Ordering::SeqCst)
    }

    /// Ready means all dependencies satisfied while still dirty.
    pub fn is_ready(&self) -> bool {
        self.is_dirty() && self.dirty_input_count() == 0
    }
}

/// Read-only snapshot of one task's state, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskState {
    pub node: NodeId,
    pub dirty: bool,
    pub nb_dirty_inputs: u32,
    pub dirty_at_start: bool,
    pub nb_dirty_at_start: u32,
    pub restrict_to_main_thread: bool,
}

impl Task {
    pub fn snapshot(&self) -> TaskState {
        TaskState {
            node: self.node_id(),
            dirty: self.is_dirty(),
            nb_dirty_inputs: self.dirty_input_count(),
            dirty_at_start: self.dirty_at_start,
            nb_dirty_at_start: self.nb_dirty_at_start,
            restrict_to_main_thread: self.restrict_to_main_thread,
        }
    }
}

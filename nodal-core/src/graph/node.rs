//! Graph Nodes
//!
//! This module defines the boundary between the scheduler and the document
//! that owns the node graph. The document model itself (object creation,
//! undo/redo, persistence) lives outside this crate; the scheduler only
//! consumes the traits declared here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a node in the document graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The kind of node in the document graph.
///
/// The scheduler never downcasts nodes; each kind carries its own
/// edge-walking rule in the update-graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An atomic unit of work. Objects are the schedulable participants:
    /// each one becomes exactly one task per graph build.
    Object,

    /// A grouping node bundling a sub-graph of other nodes. Composites are
    /// flattened away before scheduling and never appear as tasks.
    Composite,

    /// A pure data node (a value flowing between objects). Data ports are
    /// walked through when resolving object-to-object edges but are never
    /// scheduled themselves.
    DataPort,
}

/// Names of the root data nodes that are expected to change every
/// evaluation step. The baseline dirty computation is seeded from whichever
/// of these the document actually provides.
pub const ROOT_DATA_NODES: &[&str] = &["time", "mouse position", "mouse click"];

/// Deferred-propagation helpers exposed to an object while it is being
/// evaluated.
///
/// Objects that defer part of their work ("later update" objects) announce
/// their dirty/ready transitions through this trait instead of the normal
/// synchronous pass:
///
/// - call [`set_data_dirty`](UpdateContext::set_data_dirty) on an output
///   port when its cached value becomes stale,
/// - call [`set_data_ready`](UpdateContext::set_data_ready) on the same
///   port once the new value has actually been produced,
/// - call [`wait_for_other_tasks`](UpdateContext::wait_for_other_tasks) to
///   drain downstream work whose results are needed before finishing.
///
/// Every `set_data_dirty` must be paired with an eventual `set_data_ready`
/// on the same port, or the downstream tasks it dirtied stay not-ready for
/// the remainder of the step (the next step's reset clears the stall).
pub trait UpdateContext {
    /// Mark a data port's value as stale and propagate dirtiness to its
    /// consumers, outside the normal step boundary.
    fn set_data_dirty(&self, node: NodeId);

    /// Announce that a previously dirtied data port now holds a valid
    /// value; consumers whose inputs are all satisfied become ready.
    fn set_data_ready(&self, node: NodeId);

    /// Drain ready tasks on the calling thread until only the caller's own
    /// task remains outstanding.
    fn wait_for_other_tasks(&self);
}

/// A node in the document graph, as seen by the scheduler.
///
/// Implemented by the document layer. The scheduler reads the graph
/// structure through this trait during builds and calls back into
/// [`update_if_dirty`](GraphNode::update_if_dirty) during evaluation.
pub trait GraphNode: Send + Sync {
    /// The node's identity.
    fn id(&self) -> NodeId;

    /// What kind of node this is.
    fn kind(&self) -> NodeKind;

    /// Ordered list of downstream nodes this node feeds into.
    fn outputs(&self) -> Vec<NodeId>;

    /// For data ports: the object (or composite) that owns this port.
    fn owner(&self) -> Option<NodeId> {
        None
    }

    /// For composites: the nodes bundled inside this group.
    fn members(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// True if this object's evaluation must happen on the main worker
    /// (it touches a resource that is not thread-safe).
    fn update_on_main_thread(&self) -> bool {
        false
    }

    /// True if this object defers part of its re-evaluation and drives the
    /// deferred-propagation protocol itself.
    fn does_later_update(&self) -> bool {
        false
    }

    /// Force the node's own dirty flag on. This is a scheduler-internal
    /// bulk operation used by the per-step reset and by deferred
    /// propagation; it bypasses the document's normal change notification.
    fn force_dirty(&self);

    /// Recompute the node's value if it is dirty, clearing its own dirty
    /// state. Runs on a worker thread (the main worker if
    /// [`update_on_main_thread`](GraphNode::update_on_main_thread) is
    /// true). Deferred objects use `ctx` to announce their transitions.
    fn update_if_dirty(&self, ctx: &dyn UpdateContext);
}

/// The document owning the node graph.
///
/// The scheduler holds an `Arc<dyn Document>` for the lifetime of one graph
/// build; the document must not change structurally between
/// `Scheduler::init` calls while workers are running.
pub trait Document: Send + Sync {
    /// All top-level nodes in the document, in document order. Document
    /// order is the tie-break for task creation; no other ordering is
    /// guaranteed.
    fn nodes(&self) -> Vec<Arc<dyn GraphNode>>;

    /// Look up a node by ID. Returns `None` for dangling references, which
    /// the builder tolerates by dropping the edge.
    fn node(&self, id: NodeId) -> Option<Arc<dyn GraphNode>>;

    /// Look up one of the well-known always-dirty root data nodes by name
    /// (see [`ROOT_DATA_NODES`]).
    fn root_data_node(&self, name: &str) -> Option<NodeId>;
}

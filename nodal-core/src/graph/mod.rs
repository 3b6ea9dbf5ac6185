//! Graph Model and Analysis
//!
//! This module holds everything derived from a document's structure before a
//! single task runs:
//!
//! - `node`: the node model (objects, composites, data ports) and the traits
//!   the scheduler evaluates against
//! - `connectivity`: the cycle-tolerant forward-reachability sweep that
//!   orders nodes furthest-first
//! - `builder`: flattening, task wiring, and the dirty baseline
//!
//! Everything here is computed once per `Scheduler::init` and read-only
//! while workers run.

pub mod connectivity;
pub mod node;

pub(crate) mod builder;

pub use connectivity::compute_connected;
pub use node::{Document, GraphNode, NodeId, NodeKind, UpdateContext, ROOT_DATA_NODES};

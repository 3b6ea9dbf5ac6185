//! Nodal Core
//!
//! This crate provides the incremental dataflow scheduler for the Nodal
//! node-graph engine. It implements:
//!
//! - Flattening of a node document into a parallel task graph
//! - Cycle-tolerant connectivity analysis ordered furthest-first
//! - A two-phase dirty/ready protocol driven by per-task atomic counters
//! - Deferred ("later update") propagation for objects that announce their
//!   own output transitions
//! - A worker pool over bounded lock-free ready queues, where worker 0 is
//!   the thread calling `update`
//!
//! # Architecture
//!
//! The crate is organized into two halves:
//!
//! - `graph`: the node model, connectivity analysis, and task-graph
//!   construction; computed once per `Scheduler::init`
//! - `sched`: tasks, queues, workers, and the `Scheduler` facade; the
//!   mutable runtime state of one evaluation step
//!
//! # Example
//!
//! ```rust,ignore
//! use nodal_core::{Scheduler, SchedulerConfig};
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::default());
//! scheduler.init(document)?;
//!
//! // once per frame:
//! scheduler.set_dirty()?;
//! scheduler.update()?;
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod sched;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use graph::{compute_connected, Document, GraphNode, NodeId, NodeKind, UpdateContext};
pub use sched::{Scheduler, TaskState};

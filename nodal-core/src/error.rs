//! Scheduler errors.

use thiserror::Error;

use crate::graph::node::NodeId;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A scheduling call arrived before `Scheduler::init`.
    #[error("scheduler not initialized; call init() with a document first")]
    NotInitialized,

    /// A deferred-propagation call named a node the document no longer has.
    #[error("unknown data node {0:?}")]
    UnknownDataNode(NodeId),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

//! Deferred ("later update") propagation
//!
//! Objects that opt out of synchronous re-evaluation announce their output
//! transitions explicitly: `set_data_dirty` when a port's value goes stale,
//! `set_data_ready` once the new value exists. Both operate through a
//! per-port cache of (forward-reachable node set, immediate consumer
//! tasks), built eagerly for registered ports at graph-build time and
//! lazily for anything announced later.
//!
//! Cache entries live for one graph build; the builder recreates the cache
//! whenever the task graph changes.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;

use crate::error::SchedulerError;
use crate::graph::builder::resolve_consumers;
use crate::graph::connectivity::compute_connected;
use crate::graph::node::{Document, GraphNode, NodeId};
use crate::sched::state::StepState;

/// Cached propagation data for one deferred-output data node.
struct LaterUpdateEntry {
    /// Every node forward-reachable from the port (not crossing further
    /// later-update boundaries); force-marked dirty on `set_data_dirty`.
    reachable: Vec<NodeId>,
    /// Task indices of the port's immediate consumers, resolved through
    /// intervening data ports exactly like regular task edges.
    consumers: Vec<usize>,
}

/// The per-build cache, keyed by data node.
pub(crate) struct LaterUpdates {
    entries: DashMap<NodeId, LaterUpdateEntry>,
}

impl LaterUpdates {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Compute and cache the entry for `port` if not already present.
    pub fn prepare(
        &self,
        doc: &dyn Document,
        task_of: &IndexMap<NodeId, usize>,
        port: &Arc<dyn GraphNode>,
    ) {
        self.entries.entry(port.id()).or_insert_with(|| {
            let reachable = compute_connected(doc, &[port.id()]);
            let consumers =
                resolve_consumers(doc, task_of, port.owner(), &[port.id()]).into_vec();
            LaterUpdateEntry {
                reachable,
                consumers,
            }
        });
    }

    pub fn consumers(&self, port: NodeId) -> Option<Vec<usize>> {
        self.entries.get(&port).map(|e| e.consumers.clone())
    }

    pub fn reachable(&self, port: NodeId) -> Option<Vec<NodeId>> {
        self.entries.get(&port).map(|e| e.reachable.clone())
    }
}

impl StepState {
    /// Ensure the deferred cache entry for `port` exists.
    pub(crate) fn prepare_later_update(&self, port: NodeId) -> Result<(), SchedulerError> {
        let node = self
            .doc
            .node(port)
            .ok_or(SchedulerError::UnknownDataNode(port))?;
        self.graph
            .later
            .prepare(self.doc.as_ref(), &self.graph.task_of, &node);
        Ok(())
    }

    /// A deferred output went stale: force-dirty everything reachable from
    /// it, then walk dirtiness into the task graph. Consumers get one more
    /// unmet input; a task dirtied for the first time carries the walk on
    /// into its own downstream tasks (which are past the deferred boundary
    /// and use their normal edges).
    pub(crate) fn set_data_dirty(&self, port: NodeId) -> Result<(), SchedulerError> {
        self.prepare_later_update(port)?;

        let reachable = self.graph.later.reachable(port).unwrap_or_default();
        for id in reachable {
            if let Some(node) = self.doc.node(id) {
                node.force_dirty();
            }
        }

        let mut walk: VecDeque<usize> = self
            .graph
            .later
            .consumers(port)
            .unwrap_or_default()
            .into();
        while let Some(index) = walk.pop_front() {
            let task = &self.graph.tasks[index];
            task.nb_dirty_inputs.fetch_add(1, Ordering::SeqCst);
            if !task.dirty.swap(true, Ordering::SeqCst) {
                walk.extend(task.outputs.iter().copied());
            }
        }
        Ok(())
    }

    /// A deferred output is valid again: release its consumers. Any
    /// consumer whose last unmet input this was becomes ready.
    ///
    /// Must pair with an earlier `set_data_dirty` on the same port; an
    /// unpaired call is ignored at the zero floor rather than wrapping the
    /// counter.
    pub(crate) fn set_data_ready(&self, port: NodeId) -> Result<(), SchedulerError> {
        self.prepare_later_update(port)?;

        for index in self.graph.later.consumers(port).unwrap_or_default() {
            let task = &self.graph.tasks[index];
            if let Ok(previous) =
                task.nb_dirty_inputs
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1))
            {
                if previous == 1 && task.is_dirty() {
                    self.ready_task(index);
                }
            }
        }
        Ok(())
    }
}

//! Update Graph Builder
//!
//! Turns the document's node graph into the scheduler's task graph: one
//! task per flattened object, task-to-task edges resolved through data
//! ports, baseline dirty state computed from the always-changing root data
//! nodes, and later-update output ports registered with the deferred cache.
//!
//! Runs once per graph (re)configuration, with all workers stopped. There
//! is no error path here: malformed edges (dangling references, edges
//! leaving the flattened set) are silently dropped, a tolerated consequence
//! of incremental graph states during editing.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use super::connectivity::compute_connected;
use super::node::{Document, GraphNode, NodeId, NodeKind, ROOT_DATA_NODES};
use crate::sched::later::LaterUpdates;
use crate::sched::task::Task;

/// Everything derived from one graph build. Structurally immutable until
/// the next build; only the tasks' live atomics and the deferred cache
/// change during a step.
pub(crate) struct TaskGraph {
    pub tasks: Vec<Task>,
    /// Object node -> task index, in encounter order.
    pub task_of: IndexMap<NodeId, usize>,
    /// Nodes force-marked dirty at the start of every step.
    pub set_dirty_list: Vec<NodeId>,
    /// Deferred-propagation cache (eagerly seeded here, lazily grown
    /// mid-step).
    pub later: LaterUpdates,
}

impl TaskGraph {
    pub fn task_index(&self, node: NodeId) -> Option<usize> {
        self.task_of.get(&node).copied()
    }
}

/// Build the task graph for the current document state.
pub(crate) fn build(doc: &Arc<dyn Document>) -> TaskGraph {
    // Flatten composites down to schedulable objects, in encounter order.
    let mut objects = Vec::new();
    let mut seen = HashSet::new();
    flatten(doc.as_ref(), &doc.nodes(), &mut objects, &mut seen);

    let mut tasks: Vec<Task> = objects.into_iter().map(Task::new).collect();
    let task_of: IndexMap<NodeId, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.node_id(), i))
        .collect();

    // Wire task-to-task edges by resolving each object's downstream
    // connections through intervening data ports.
    for i in 0..tasks.len() {
        let id = tasks[i].node_id();
        let starts = tasks[i].node.outputs();
        tasks[i].outputs = resolve_consumers(doc.as_ref(), &task_of, Some(id), &starts);
    }

    // Baseline dirty state, seeded from the always-changing roots.
    let seeds: Vec<NodeId> = ROOT_DATA_NODES
        .iter()
        .filter_map(|name| doc.root_data_node(name))
        .collect();
    let set_dirty_list = compute_connected(doc.as_ref(), &seeds);
    compute_baseline(&mut tasks, &task_of, &set_dirty_list);

    // Register every later-update object's output ports eagerly so the
    // first mid-step setDataDirty does not pay for the sweep.
    let later = LaterUpdates::new();
    for task in &tasks {
        if !task.node.does_later_update() {
            continue;
        }
        for out in task.node.outputs() {
            if let Some(port) = doc.node(out) {
                if port.kind() == NodeKind::DataPort {
                    later.prepare(doc.as_ref(), &task_of, &port);
                }
            }
        }
    }

    debug!(
        tasks = tasks.len(),
        dirty_roots = seeds.len(),
        set_dirty = set_dirty_list.len(),
        "update graph built"
    );

    TaskGraph {
        tasks,
        task_of,
        set_dirty_list,
        later,
    }
}

/// Recursively expand composites into their member objects. Data ports are
/// never schedulable and composites never survive flattening.
fn flatten(
    doc: &dyn Document,
    nodes: &[Arc<dyn GraphNode>],
    out: &mut Vec<Arc<dyn GraphNode>>,
    seen: &mut HashSet<u64>,
) {
    for node in nodes {
        match node.kind() {
            NodeKind::Object => {
                if seen.insert(node.id().raw()) {
                    out.push(node.clone());
                }
            }
            NodeKind::Composite => {
                let members: Vec<Arc<dyn GraphNode>> = node
                    .members()
                    .into_iter()
                    .filter_map(|id| doc.node(id))
                    .collect();
                flatten(doc, &members, out, seen);
            }
            NodeKind::DataPort => {}
        }
    }
}

/// Resolve a set of downstream connections to the task indices of the
/// consuming objects.
///
/// Objects communicate through data ports, so the walk continues through
/// each port until it reaches one owned by a flattened object (the
/// consumer). Ports owned by `exclude` (the producing object itself) or by
/// composites are pass-throughs: their own outputs are followed instead,
/// which unwraps composite boundaries in both directions. Anything that
/// does not resolve to a known task is dropped.
pub(crate) fn resolve_consumers(
    doc: &dyn Document,
    task_of: &IndexMap<NodeId, usize>,
    exclude: Option<NodeId>,
    starts: &[NodeId],
) -> SmallVec<[usize; 4]> {
    let mut result: SmallVec<[usize; 4]> = SmallVec::new();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut frontier: VecDeque<NodeId> = starts.iter().copied().collect();

    while let Some(id) = frontier.pop_front() {
        if !visited.insert(id.raw()) {
            continue;
        }
        let Some(node) = doc.node(id) else {
            continue; // dangling, dropped
        };
        match node.kind() {
            NodeKind::Object => {
                if Some(id) != exclude {
                    if let Some(&task) = task_of.get(&id) {
                        if !result.contains(&task) {
                            result.push(task);
                        }
                    }
                }
            }
            // Direct edges to a composite shell do not resolve to work;
            // composite wiring goes through its boundary ports.
            NodeKind::Composite => {}
            NodeKind::DataPort => match node.owner() {
                Some(owner) if Some(owner) != exclude && task_of.contains_key(&owner) => {
                    let task = task_of[&owner];
                    if !result.contains(&task) {
                        result.push(task);
                    }
                }
                _ => frontier.extend(node.outputs()),
            },
        }
    }

    result
}

/// Baseline ("dirty at start") computation, run once after output wiring.
///
/// Every non-later-update task in the set-dirty list starts dirty and
/// increments each resolved downstream task's baseline count. A task whose
/// count ends up nonzero is forced baseline-dirty as well, but does not
/// itself propagate into *its* downstream counts; that asymmetry is
/// longstanding behavior the rest of the protocol relies on staying put.
fn compute_baseline(tasks: &mut [Task], task_of: &IndexMap<NodeId, usize>, set_dirty: &[NodeId]) {
    for id in set_dirty {
        let Some(&index) = task_of.get(id) else {
            continue; // data nodes and composites have no task
        };
        if tasks[index].node.does_later_update() {
            continue;
        }
        tasks[index].dirty_at_start = true;
        let outputs = tasks[index].outputs.clone();
        for out in outputs {
            tasks[out].nb_dirty_at_start += 1;
        }
    }
    for task in tasks.iter_mut() {
        if task.nb_dirty_at_start > 0 {
            task.dirty_at_start = true;
        }
    }
}

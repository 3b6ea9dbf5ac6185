//! Connectivity Analyzer
//!
//! Computes the forward-reachable subgraph from a set of seed nodes,
//! tolerating cycles, and orders the result so that every node appears
//! after everything that feeds into it (furthest from the seeds first).
//!
//! # Algorithm
//!
//! Breadth-first expansion over the `outputs` edges with a FIFO open queue:
//!
//! 1. Each reached node gets one record holding its graph distance from the
//!    seeds and the set of records that discovered it (its parents in the
//!    search tree).
//! 2. When a node is re-discovered through a different path it is moved to
//!    the back of the open queue and its distance/parent set is updated in
//!    place. Multiple incoming paths accumulate, and the node's final
//!    position reflects the *last* path that reached it.
//! 3. An edge is not traversed if its target is already an ancestor of the
//!    current node along the search tree; this is what bounds the sweep on
//!    a true cycle while still visiting every cycle member once.
//! 4. Later-update nodes are visited but act as boundaries: their outgoing
//!    edges are not followed (unless the node is itself a seed). Their
//!    downstream effects are handled by the deferred-propagation protocol.
//!
//! Records are internal bookkeeping and discarded after the sweep.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use smallvec::SmallVec;

use super::node::{Document, GraphNode, NodeId, NodeKind};

/// Per-reached-node bookkeeping, indexed by position in the record arena.
struct Record {
    node: NodeId,
    distance: u32,
    /// Record indices of the nodes that discovered this one. Only used for
    /// the ancestor walk that suppresses cycle edges.
    parents: SmallVec<[usize; 4]>,
}

/// Compute every node forward-reachable from `seeds`, ordered from furthest
/// to closest, each node exactly once at its last-visited position.
///
/// Seeds that do not resolve to a document node are skipped, like any other
/// dangling reference.
pub fn compute_connected(doc: &dyn Document, seeds: &[NodeId]) -> Vec<NodeId> {
    let mut sweep = Sweep {
        doc,
        records: Vec::new(),
        index_of: HashMap::new(),
        open: VecDeque::new(),
        order: Vec::new(),
        seed_count: 0,
    };
    sweep.seed(seeds);
    sweep.run();
    sweep.into_result()
}

/// True if the node defers its own dirty propagation: either a later-update
/// object, or a data port owned by one.
fn defers_propagation(doc: &dyn Document, node: &Arc<dyn GraphNode>) -> bool {
    match node.kind() {
        NodeKind::Object | NodeKind::Composite => node.does_later_update(),
        NodeKind::DataPort => node
            .owner()
            .and_then(|owner| doc.node(owner))
            .is_some_and(|owner| owner.does_later_update()),
    }
}

struct Sweep<'a> {
    doc: &'a dyn Document,
    records: Vec<Record>,
    index_of: HashMap<u64, usize>,
    open: VecDeque<usize>,
    /// Pop order, deduplicated to each record's last occurrence.
    order: Vec<usize>,
    seed_count: usize,
}

impl Sweep<'_> {
    fn seed(&mut self, seeds: &[NodeId]) {
        for &seed in seeds {
            if self.doc.node(seed).is_none() || self.index_of.contains_key(&seed.raw()) {
                continue;
            }
            let idx = self.records.len();
            self.records.push(Record {
                node: seed,
                distance: 0,
                parents: SmallVec::new(),
            });
            self.index_of.insert(seed.raw(), idx);
            self.open.push_back(idx);
        }
        self.seed_count = self.records.len();
    }

    fn run(&mut self) {
        while let Some(current) = self.open.pop_front() {
            self.visit(current);

            let node_id = self.records[current].node;
            let Some(node) = self.doc.node(node_id) else {
                continue;
            };

            // Later-update nodes are boundaries for this sweep; a seed is
            // still expanded (the deferred protocol sweeps from the port
            // itself).
            if current >= self.seed_count && defers_propagation(self.doc, &node) {
                continue;
            }

            for out in node.outputs() {
                if self.doc.node(out).is_none() {
                    continue; // dangling edge, dropped
                }
                self.follow_edge(current, out);
            }
        }
    }

    fn follow_edge(&mut self, current: usize, target: NodeId) {
        match self.index_of.get(&target.raw()).copied() {
            Some(existing) => {
                if self.is_ancestor(current, existing) {
                    return;
                }
                let distance = self.records[current].distance + 1;
                let record = &mut self.records[existing];
                record.distance = distance;
                if !record.parents.contains(&current) {
                    record.parents.push(current);
                }
                // Move to the back of the open queue so the node is
                // processed after everything on its newest path. The linear
                // scan makes re-discovery O(queue); fine for graphs of
                // hundreds of nodes, a hot path beyond that.
                if let Some(pos) = self.open.iter().position(|&i| i == existing) {
                    self.open.remove(pos);
                }
                self.open.push_back(existing);
            }
            None => {
                let idx = self.records.len();
                self.records.push(Record {
                    node: target,
                    distance: self.records[current].distance + 1,
                    parents: SmallVec::from_slice(&[current]),
                });
                self.index_of.insert(target.raw(), idx);
                self.open.push_back(idx);
            }
        }
    }

    /// Walk the recorded parent chain of `start` (inclusive) looking for
    /// `candidate`. Bounded by the record count.
    fn is_ancestor(&self, start: usize, candidate: usize) -> bool {
        let mut stack: Vec<usize> = vec![start];
        let mut seen = vec![false; self.records.len()];
        while let Some(idx) = stack.pop() {
            if idx == candidate {
                return true;
            }
            if !seen[idx] {
                seen[idx] = true;
                stack.extend(self.records[idx].parents.iter().copied());
            }
        }
        false
    }

    /// Record a pop, keeping only the last occurrence of each record.
    fn visit(&mut self, record: usize) {
        if let Some(pos) = self.order.iter().position(|&i| i == record) {
            self.order.remove(pos);
        }
        self.order.push(record);
    }

    fn into_result(self) -> Vec<NodeId> {
        self.order
            .iter()
            .rev()
            .map(|&i| self.records[i].node)
            .collect()
    }
}

//! Scheduler State
//!
//! Everything shared between the calling thread and the worker threads for
//! the lifetime of one graph build: the task graph, the ready queues, the
//! outstanding-ready counter, and the worker wake/close signals. The task
//! graph is structurally immutable here; only per-task atomics and the
//! deferred cache change while workers run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, trace};

use crate::config::SchedulerConfig;
use crate::graph::builder::{self, TaskGraph};
use crate::graph::node::{Document, NodeId, UpdateContext};
use crate::sched::queue::ReadyQueues;
use crate::sched::worker::WorkerSignal;

pub(crate) struct StepState {
    pub doc: Arc<dyn Document>,
    pub graph: TaskGraph,
    queues: ReadyQueues,
    /// Tasks enqueued or executing, not yet finished. Zero means quiescent.
    nb_ready: AtomicUsize,
    /// Wake/sleep/close signals for workers 1..N-1. The main worker (0) is
    /// the thread calling `update` and has no signal.
    pub signals: Vec<Arc<WorkerSignal>>,
}

impl StepState {
    pub fn new(doc: Arc<dyn Document>, config: &SchedulerConfig) -> Self {
        let graph = builder::build(&doc);
        let signals = (1..config.worker_threads())
            .map(|_| Arc::new(WorkerSignal::new()))
            .collect();
        Self {
            doc,
            graph,
            queues: ReadyQueues::new(config.queue_capacity),
            nb_ready: AtomicUsize::new(0),
            signals,
        }
    }

    /// Per-step reset: force-mark the cached set-dirty list and restore
    /// every task's live state from its baseline. Idempotent.
    pub fn set_dirty(&self) {
        for &id in &self.graph.set_dirty_list {
            if let Some(node) = self.doc.node(id) {
                node.force_dirty();
            }
        }
        for task in &self.graph.tasks {
            task.reset();
        }
    }

    /// A task's dependencies are all satisfied: count it outstanding and
    /// hand it to the queue matching its thread restriction.
    pub fn ready_task(&self, index: usize) {
        self.nb_ready.fetch_add(1, Ordering::SeqCst);
        self.queues
            .push(index, self.graph.tasks[index].restrict_to_main_thread);
    }

    pub fn get_task(&self, main_thread: bool) -> Option<usize> {
        self.queues.pop(main_thread)
    }

    pub fn execute(&self, index: usize, ctx: &dyn UpdateContext) {
        let task = &self.graph.tasks[index];
        trace!(node = task.node_id().raw(), "executing task");
        task.node.update_if_dirty(ctx);
    }

    /// A task completed: clear it, release its downstream tasks, and drop
    /// it from the outstanding count.
    ///
    /// A later-update task releases nothing here. Its consumers never
    /// received a baseline count from it, so their live counts at this
    /// point belong entirely to pending `set_data_dirty` announcements and
    /// only `set_data_ready` may settle them.
    pub fn finish_task(&self, index: usize) {
        let task = &self.graph.tasks[index];
        task.dirty.store(false, Ordering::SeqCst);
        if task.node.does_later_update() {
            self.nb_ready.fetch_sub(1, Ordering::SeqCst);
            return;
        }
        for &out in &task.outputs {
            let downstream = &self.graph.tasks[out];
            if !downstream.is_dirty() {
                continue;
            }
            if let Ok(previous) = downstream.nb_dirty_inputs.fetch_update(
                Ordering::SeqCst,
                Ordering::SeqCst,
                |v| v.checked_sub(1),
            ) {
                if previous == 1 {
                    self.ready_task(out);
                }
            }
        }
        self.nb_ready.fetch_sub(1, Ordering::SeqCst);
    }

    /// If nothing is outstanding, tell every worker to sleep and report
    /// quiescence.
    pub fn test_for_end(&self) -> bool {
        if self.nb_ready.load(Ordering::SeqCst) != 0 {
            return false;
        }
        for signal in &self.signals {
            signal.sleep();
        }
        true
    }

    /// Run one full pass, with the calling thread acting as the main
    /// worker. Returns at quiescence as seen from this thread.
    pub fn update(self: &Arc<Self>) {
        self.nb_ready.store(0, Ordering::SeqCst);
        // Entries left by readiness announced between steps are re-derived
        // from task state by the scan below.
        self.queues.clear();

        for (index, task) in self.graph.tasks.iter().enumerate() {
            if task.is_ready() {
                self.ready_task(index);
            }
        }

        for signal in &self.signals {
            signal.wake_up();
        }

        let ctx = SchedulerContext::new(self.clone(), true);
        self.run_main(&ctx);

        let stalled = self.graph.tasks.iter().filter(|t| t.is_dirty()).count();
        if stalled > 0 {
            // Deferred outputs that never announced readiness; the next
            // set_dirty resets them.
            debug!(stalled, "step ended with tasks awaiting deferred readiness");
        }
    }

    /// The main worker's loop body: drain tasks until quiescent.
    fn run_main(&self, ctx: &SchedulerContext) {
        loop {
            match self.get_task(true) {
                Some(index) => {
                    self.execute(index, ctx);
                    self.finish_task(index);
                }
                None => {
                    if self.test_for_end() {
                        return;
                    }
                    thread::yield_now();
                }
            }
        }
    }

    /// Drain tasks on the calling thread until only the caller's own task
    /// remains outstanding. Blocks for as long as the remaining work takes
    /// to become poppable from here; waiting on a task that never becomes
    /// ready within this call is a caller contract violation and never
    /// returns.
    pub fn wait_for_other_tasks(self: &Arc<Self>, main_thread: bool) {
        let ctx = SchedulerContext::new(self.clone(), main_thread);
        while self.nb_ready.load(Ordering::SeqCst) > 1 {
            match self.get_task(main_thread) {
                Some(index) => {
                    self.execute(index, &ctx);
                    self.finish_task(index);
                }
                None => thread::yield_now(),
            }
        }
    }

    pub fn outstanding(&self) -> usize {
        self.nb_ready.load(Ordering::SeqCst)
    }
}

/// The scheduler as seen by an object during its own evaluation: the
/// deferred-propagation entry points, bound to the worker the object is
/// running on.
pub struct SchedulerContext {
    state: Arc<StepState>,
    main_thread: bool,
}

impl SchedulerContext {
    pub(crate) fn new(state: Arc<StepState>, main_thread: bool) -> Self {
        Self { state, main_thread }
    }
}

impl UpdateContext for SchedulerContext {
    fn set_data_dirty(&self, node: NodeId) {
        if let Err(err) = self.state.set_data_dirty(node) {
            // A port that vanished mid-edit is the same tolerated
            // degenerate case as a dangling edge.
            debug!(%err, "set_data_dirty ignored");
        }
    }

    fn set_data_ready(&self, node: NodeId) {
        if let Err(err) = self.state.set_data_ready(node) {
            debug!(%err, "set_data_ready ignored");
        }
    }

    fn wait_for_other_tasks(&self) {
        self.state.wait_for_other_tasks(self.main_thread);
    }
}

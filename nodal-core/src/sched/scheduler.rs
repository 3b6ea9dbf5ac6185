//! Scheduler
//!
//! The public facade over the dispatch core. One `Scheduler` is
//! constructed per document/session; `init` (re)builds all graph-derived
//! state and starts the worker pool, `stop` joins and discards the
//! workers. A typical evaluation step is `set_dirty()` followed by
//! `update()`.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::graph::node::{Document, NodeId};
use crate::sched::state::StepState;
use crate::sched::task::TaskState;
use crate::sched::worker::worker_loop;

type Result<T> = std::result::Result<T, SchedulerError>;

pub struct Scheduler {
    config: SchedulerConfig,
    state: Option<Arc<StepState>>,
    threads: Vec<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: None,
            threads: Vec::new(),
        }
    }

    /// (Re)build the task graph from the document's current structure and
    /// start the worker pool. Must be called again after any structural
    /// graph change (object added/removed/reconnected); tasks are never
    /// partially mutated between builds.
    pub fn init(&mut self, doc: Arc<dyn Document>) -> Result<()> {
        self.stop();

        let state = Arc::new(StepState::new(doc, &self.config));
        for (index, signal) in state.signals.iter().enumerate() {
            let state = Arc::clone(&state);
            let signal = Arc::clone(signal);
            let handle = thread::Builder::new()
                .name(format!("nodal-worker-{}", index + 1))
                .spawn(move || worker_loop(state, signal))?;
            self.threads.push(handle);
        }

        debug!(
            tasks = state.graph.tasks.len(),
            workers = self.threads.len() + 1,
            "scheduler initialized"
        );
        self.state = Some(state);
        Ok(())
    }

    /// Join and discard the worker threads. The built state stays around
    /// for inspection; `update` keeps working single-threaded until the
    /// next `init`.
    pub fn stop(&mut self) {
        if let Some(state) = &self.state {
            for signal in &state.signals {
                signal.close();
            }
        }
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
    }

    /// Start a new evaluation step: force-mark the always-changing set and
    /// reset every task from its baseline. Idempotent.
    pub fn set_dirty(&self) -> Result<()> {
        self.state()?.set_dirty();
        Ok(())
    }

    /// Run one full pass, blocking until quiescent. The calling thread
    /// acts as the main worker, so main-thread-restricted objects execute
    /// here.
    pub fn update(&self) -> Result<()> {
        self.state()?.update();
        Ok(())
    }

    /// Deferred propagation: a later-update object's output port went
    /// stale. See [`UpdateContext`](crate::graph::node::UpdateContext) for
    /// the pairing contract.
    pub fn set_data_dirty(&self, node: NodeId) -> Result<()> {
        self.state()?.set_data_dirty(node)
    }

    /// Deferred propagation: a previously dirtied output port holds a
    /// valid value again.
    pub fn set_data_ready(&self, node: NodeId) -> Result<()> {
        self.state()?.set_data_ready(node)
    }

    /// Drain ready tasks on the calling thread until at most the caller's
    /// own task remains outstanding. `main_thread` states whether the
    /// caller is on the thread that drives `update`.
    pub fn wait_for_other_tasks(&self, main_thread: bool) -> Result<()> {
        self.state()?.wait_for_other_tasks(main_thread);
        Ok(())
    }

    /// Read-only snapshot of every task's state, in task order. For
    /// diagnostics and tests.
    pub fn task_states(&self) -> Result<Vec<TaskState>> {
        Ok(self
            .state()?
            .graph
            .tasks
            .iter()
            .map(|t| t.snapshot())
            .collect())
    }

    /// The task index for an object node, if it is scheduled.
    pub fn task_index(&self, node: NodeId) -> Result<Option<usize>> {
        Ok(self.state()?.graph.task_index(node))
    }

    fn state(&self) -> Result<&Arc<StepState>> {
        self.state.as_ref().ok_or(SchedulerError::NotInitialized)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

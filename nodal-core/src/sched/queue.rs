//! Ready Queues
//!
//! Two bounded lock-free ring buffers holding the indices of ready tasks:
//! a general queue any worker may pop, and a main-thread queue reserved for
//! tasks whose objects must run on the main worker. Producers never block;
//! overflowing a queue means it was sized too small for the graph, which is
//! a configuration fault rather than a runtime condition.

use crossbeam_queue::ArrayQueue;

pub(crate) struct ReadyQueues {
    general: ArrayQueue<usize>,
    main: ArrayQueue<usize>,
}

impl ReadyQueues {
    pub fn new(capacity: usize) -> Self {
        Self {
            general: ArrayQueue::new(capacity),
            main: ArrayQueue::new(capacity),
        }
    }

    /// Enqueue a ready task. Panics on overflow; see
    /// `SchedulerConfig::queue_capacity`.
    pub fn push(&self, index: usize, main_only: bool) {
        let queue = if main_only { &self.main } else { &self.general };
        if queue.push(index).is_err() {
            panic!(
                "ready queue overflow (capacity {}); raise SchedulerConfig::queue_capacity",
                queue.capacity()
            );
        }
    }

    /// Pop the next ready task. The main worker drains its reserved queue
    /// first; other workers only ever see the general queue.
    pub fn pop(&self, main_thread: bool) -> Option<usize> {
        if main_thread {
            self.main.pop().or_else(|| self.general.pop())
        } else {
            self.general.pop()
        }
    }

    /// Discard all queued entries. Used at the top of a step so readiness
    /// announced outside any step cannot double-dispatch a task the step
    /// scan re-derives from task state.
    pub fn clear(&self) {
        while self.general.pop().is_some() {}
        while self.main.pop().is_some() {}
    }
}

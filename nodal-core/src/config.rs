//! Scheduler configuration.

use std::thread;

/// Tunables fixed at `Scheduler::init` time.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Total worker count including the main worker. `None` picks half the
    /// available parallelism, with a floor of one (single-threaded: the
    /// calling thread does everything).
    pub threads: Option<usize>,
    /// Capacity of each ready queue. Must be at least the largest number of
    /// tasks that can be ready at once, which is bounded by the task count.
    pub queue_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            queue_capacity: 512,
        }
    }
}

impl SchedulerConfig {
    pub fn worker_threads(&self) -> usize {
        match self.threads {
            Some(n) => n.max(1),
            None => thread::available_parallelism()
                .map(|p| p.get() / 2)
                .unwrap_or(1)
                .max(1),
        }
    }
}

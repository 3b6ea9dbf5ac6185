//! Scheduling and Dispatch
//!
//! The runtime half of the crate: tasks and their atomic counters, the
//! bounded ready queues, the shared per-build state, deferred ("later
//! update") propagation, the worker pool, and the public `Scheduler`
//! facade.
//!
//! Worker 0 is virtual: it is whichever thread calls `update`, and it is
//! the only worker allowed to pop main-thread-restricted tasks.

pub mod scheduler;
pub mod task;

pub(crate) mod later;
pub(crate) mod queue;
pub(crate) mod state;
pub(crate) mod worker;

pub use scheduler::Scheduler;
pub use task::TaskState;

//! Worker Threads
//!
//! Workers 1..N-1 are dedicated OS threads running [`worker_loop`]; worker
//! 0 is the calling thread inside `update` / `wait_for_other_tasks` and
//! never has a loop of its own here. Idle workers spin-yield rather than
//! block: wake latency matters more than idle CPU for an interactive
//! evaluation step, a known tradeoff.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::trace;

use crate::sched::state::{SchedulerContext, StepState};

/// Wake/sleep/close flags for one worker thread.
///
/// Workers stop looping when put to sleep by `test_for_end` and must be
/// explicitly woken for the next step; `close` ends the loop for good.
pub(crate) struct WorkerSignal {
    awake: AtomicBool,
    closed: AtomicBool,
}

impl WorkerSignal {
    pub fn new() -> Self {
        Self {
            awake: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn wake_up(&self) {
        self.awake.store(true, Ordering::SeqCst);
    }

    pub fn sleep(&self) {
        self.awake.store(false, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_awake(&self) -> bool {
        self.awake.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Loop body for a dedicated worker thread: sleep until woken, pop and run
/// general-queue tasks while awake, exit when closed.
pub(crate) fn worker_loop(state: Arc<StepState>, signal: Arc<WorkerSignal>) {
    let ctx = SchedulerContext::new(state.clone(), false);
    trace!("worker started");
    loop {
        if signal.is_closed() {
            break;
        }
        if !signal.is_awake() {
            thread::yield_now();
            continue;
        }
        match state.get_task(false) {
            Some(index) => {
                state.execute(index, &ctx);
                state.finish_task(index);
            }
            None => thread::yield_now(),
        }
    }
    trace!("worker closed");
}

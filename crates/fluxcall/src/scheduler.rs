//! Scheduler gate: decides on which execution context a call is dispatched.
//!
//! ```text
//! subscribe ─► on_subscribe(subscription) ─► scheduler.schedule(dispatch)
//!                                                 │
//!                  Immediate ─────────────────────┤ runs dispatch now, on the subscribing thread
//!                  ManualScheduler ───────────────┤ queues dispatch until drain()
//!                  (transport crate) TokioScheduler spawns dispatch on a runtime
//! ```
//!
//! Until the gate runs the action no network call exists, so no signal can be
//! delivered. Demand requested in the meantime is recorded by the subscription.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

/// A deferred dispatch.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Runs (or arranges to run) dispatch actions.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, action: Action);

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Default gate: runs the action synchronously on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, action: Action) {
        action();
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// Gate that queues actions until [`drain`](Self::drain) is called.
///
/// Enqueueing is safe from any thread. Draining is meant for one triggering
/// thread at a time; actions scheduled while draining run in the same drain.
/// Cloning shares the queue.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<VecDeque<Action>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actions waiting to run.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Runs queued actions in FIFO order until the queue is empty and returns
    /// how many ran.
    ///
    /// The queue lock is released while each action runs, so actions may
    /// schedule further work.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.lock().pop_front();
            match next {
                Some(action) => {
                    action();
                    ran += 1;
                }
                None => break,
            }
        }
        trace!(ran, "manual scheduler drained");
        ran
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Action>> {
        // Actions never run under the lock, so a poisoned queue is still consistent.
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, action: Action) {
        self.lock().push_back(action);
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

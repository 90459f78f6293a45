//! Scheduler that defers dispatch onto a tokio runtime.

use fluxcall::{Action, Scheduler};
use tokio::runtime::Handle;

/// Runs each scheduled dispatch as a task on the given runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime the caller is currently inside.
    ///
    /// # Panics
    ///
    /// Outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, action: Action) {
        self.runtime.spawn(async move { action() });
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}

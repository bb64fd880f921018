//! The countdown tick is injected so timing logic can run against simulated time.

mod manual;
mod tokio_scheduler;

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use manual::ManualScheduler;
pub use tokio_scheduler::TokioScheduler;

/// Callback invoked once per period.
pub type TickFn = Box<dyn FnMut() + Send + 'static>;

/// Source of periodic ticks.
pub trait Scheduler: Send + Sync {
    /// Starts calling `tick` every `period` until the returned handle is cancelled or dropped.
    /// The first call happens one `period` after scheduling.
    fn schedule(&self, period: Duration, tick: TickFn) -> TickHandle;
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("No tokio runtime is available on this thread")]
    NoRuntime,
}

/// Owns a running tick source. Dropping the handle stops it.
#[derive(Debug)]
pub struct TickHandle {
    token: CancellationToken,
}

impl TickHandle {
    /// Wraps the token a custom [`Scheduler`] checks before every tick.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stops the tick source. No tick starts after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[allow(missing_docs)]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

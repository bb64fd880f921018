use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio_util::sync::CancellationToken;

use super::{Scheduler, TickFn, TickHandle};

/// A scheduler driven by an explicit clock. Nothing ticks until [`ManualScheduler::advance`] is
/// called, which fires every due tick in order.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    sources: Vec<ManualSource>,
}

struct ManualSource {
    period: Duration,
    next_due: Duration,
    token: CancellationToken,
    tick: Arc<Mutex<TickFn>>,
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now())
            .field("active_sources", &self.active_sources())
            .finish()
    }
}

impl ManualScheduler {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.inner.lock().expect("Mutex is not poisoned").now
    }

    /// Number of tick sources that have not been cancelled.
    pub fn active_sources(&self) -> usize {
        let mut state = self.inner.lock().expect("Mutex is not poisoned");
        state.sources.retain(|s| !s.token.is_cancelled());
        state.sources.len()
    }

    /// Moves the clock forward, firing each due tick.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;

        while let Some(tick) = self.next_due(target) {
            // The state lock is released here so a tick may schedule or cancel sources.
            let mut guard = tick.lock().expect("Mutex is not poisoned");
            (*guard)();
        }

        let mut state = self.inner.lock().expect("Mutex is not poisoned");
        state.now = target;
    }

    /// Shorthand for advancing by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    fn next_due(&self, target: Duration) -> Option<Arc<Mutex<TickFn>>> {
        let mut state = self.inner.lock().expect("Mutex is not poisoned");
        state.sources.retain(|s| !s.token.is_cancelled());

        let source = state
            .sources
            .iter_mut()
            .filter(|s| s.next_due <= target)
            .min_by_key(|s| s.next_due)?;

        let due = source.next_due;
        source.next_due += source.period;
        let tick = source.tick.clone();
        state.now = due;
        Some(tick)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, period: Duration, tick: TickFn) -> TickHandle {
        let period = period.max(Duration::from_millis(1));
        let token = CancellationToken::new();

        let mut state = self.inner.lock().expect("Mutex is not poisoned");
        let next_due = state.now + period;
        state.sources.push(ManualSource {
            period,
            next_due,
            token: token.clone(),
            tick: Arc::new(Mutex::new(tick)),
        });

        TickHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting(count: &Arc<AtomicUsize>) -> TickFn {
        let count = count.clone();
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn fires_once_per_elapsed_period() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule(Duration::from_secs(1), counting(&count));

        scheduler.advance(Duration::from_millis(999));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.advance_secs(10);
        assert_eq!(count.load(Ordering::SeqCst), 11);
        assert_eq!(scheduler.now(), Duration::from_secs(11));
    }

    #[test]
    fn cancelled_sources_stop_and_are_pruned() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule(Duration::from_secs(1), counting(&count));
        assert_eq!(scheduler.active_sources(), 1);

        scheduler.advance_secs(2);
        handle.cancel();
        scheduler.advance_secs(5);

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.active_sources(), 0);
    }

    #[test]
    fn drop_cancels() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        drop(scheduler.schedule(Duration::from_secs(1), counting(&count)));

        scheduler.advance_secs(3);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_sources(), 0);
    }
}

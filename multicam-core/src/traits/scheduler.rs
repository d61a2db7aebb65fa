use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Task run once by a scheduler.
pub type OneShotTask = Box<dyn FnOnce() + Send + 'static>;

/// Task run on every tick of a repeating timer.
pub type RepeatingTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Timer source for periodic sampling, settle delays and freezes.
///
/// Production code uses real threads; tests use a virtual clock.
pub trait Scheduler: Send + Sync {
    /// Time elapsed on this scheduler's clock.
    fn now(&self) -> Duration;

    fn schedule_once(&self, delay: Duration, task: OneShotTask) -> TimerHandle;

    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerHandle;
}

/// Cancellation handle for a scheduled task.
///
/// The task body runs while holding the handle's guard, so once `cancel`
/// returns the task is neither running nor will run again. A task must not
/// cancel its own handle.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    live: Arc<Mutex<bool>>,
}

impl TimerHandle {
    pub fn new() -> Self {
        Self {
            live: Arc::new(Mutex::new(true)),
        }
    }

    pub fn cancel(&self) {
        *self.live.lock() = false;
    }

    pub fn is_cancelled(&self) -> bool {
        !*self.live.lock()
    }

    /// Run `f` unless cancelled. Returns whether it ran.
    ///
    /// Scheduler implementations wrap every task invocation in this.
    pub fn run_if_live(&self, f: impl FnOnce()) -> bool {
        let live = self.live.lock();
        if !*live {
            return false;
        }
        f();
        true
    }

    /// Mark a one-shot timer as spent after it fired.
    pub fn retire(&self) {
        self.cancel();
    }
}

impl Default for TimerHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_until_cancelled() {
        let handle = TimerHandle::new();
        let mut count = 0;

        assert!(handle.run_if_live(|| count += 1));
        handle.cancel();
        assert!(!handle.run_if_live(|| count += 1));

        assert_eq!(count, 1);
        assert!(handle.is_cancelled());
    }

    #[test]
    fn clones_share_cancellation() {
        let handle = TimerHandle::new();
        let other = handle.clone();
        other.cancel();
        assert!(handle.is_cancelled());
    }
}

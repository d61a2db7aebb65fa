use std::thread;
use std::time::{Duration, Instant};

use crate::traits::scheduler::{OneShotTask, RepeatingTask, Scheduler, TimerHandle};

/// Wall-clock scheduler backed by one named thread per timer.
///
/// Timer tasks only enqueue session events, so the threads stay idle
/// between ticks. A cancelled one-shot thread lingers until its deadline
/// and then exits without running the task.
#[derive(Debug, Clone)]
pub struct ThreadScheduler {
    epoch: Instant,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for ThreadScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ThreadScheduler {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn schedule_once(&self, delay: Duration, task: OneShotTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let timer = handle.clone();

        thread::Builder::new()
            .name("multicam-timer".into())
            .spawn(move || {
                thread::sleep(delay);
                timer.run_if_live(task);
                timer.retire();
            })
            .expect("failed to spawn timer thread");

        handle
    }

    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let timer = handle.clone();

        thread::Builder::new()
            .name("multicam-sampler".into())
            .spawn(move || loop {
                thread::sleep(interval);
                if !timer.run_if_live(|| task()) {
                    break;
                }
            })
            .expect("failed to spawn sampler thread");

        handle
    }
}

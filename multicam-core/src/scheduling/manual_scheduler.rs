use std::time::Duration;

use parking_lot::Mutex;

use crate::traits::scheduler::{OneShotTask, RepeatingTask, Scheduler, TimerHandle};

/// Smallest period a repeating timer may have, so `advance` always terminates.
const MIN_INTERVAL: Duration = Duration::from_micros(1);

enum TimerTask {
    Once(OneShotTask),
    Repeating(RepeatingTask),
}

struct TimerEntry {
    seq: u64,
    deadline: Duration,
    interval: Option<Duration>,
    task: TimerTask,
    handle: TimerHandle,
}

struct VirtualClock {
    now: Duration,
    next_seq: u64,
    entries: Vec<TimerEntry>,
}

/// Virtual-clock scheduler for deterministic tests.
///
/// Nothing fires until `advance` is called. Timers due within the advanced
/// span fire in deadline order (ties in scheduling order), with the clock
/// set to each timer's deadline while its task runs. Tasks may schedule
/// further timers; those fire in the same `advance` if they fall due.
pub struct ManualScheduler {
    clock: Mutex<VirtualClock>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            clock: Mutex::new(VirtualClock {
                now: Duration::ZERO,
                next_seq: 0,
                entries: Vec::new(),
            }),
        }
    }

    /// Move the clock forward by `by`, firing every timer that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;

        while let Some(entry) = self.take_next_due(target) {
            match entry.task {
                TimerTask::Once(task) => {
                    entry.handle.run_if_live(task);
                    entry.handle.retire();
                }
                TimerTask::Repeating(task) => {
                    let ran = entry.handle.run_if_live(|| task());
                    if ran {
                        let interval = entry.interval.unwrap_or(MIN_INTERVAL);
                        let mut clock = self.clock.lock();
                        let seq = clock.next_seq;
                        clock.next_seq += 1;
                        clock.entries.push(TimerEntry {
                            seq,
                            deadline: entry.deadline + interval,
                            interval: Some(interval),
                            task: TimerTask::Repeating(task),
                            handle: entry.handle,
                        });
                    }
                }
            }
        }

        let mut clock = self.clock.lock();
        if clock.now < target {
            clock.now = target;
        }
    }

    /// Advance by a number of seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }

    /// Number of timers that are scheduled and not cancelled.
    pub fn pending_timers(&self) -> usize {
        self.clock
            .lock()
            .entries
            .iter()
            .filter(|entry| !entry.handle.is_cancelled())
            .count()
    }

    /// Number of live repeating timers.
    pub fn repeating_timers(&self) -> usize {
        self.clock
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.interval.is_some() && !entry.handle.is_cancelled())
            .count()
    }

    fn take_next_due(&self, target: Duration) -> Option<TimerEntry> {
        let mut clock = self.clock.lock();
        clock.entries.retain(|entry| !entry.handle.is_cancelled());

        let position = clock
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.deadline <= target)
            .min_by_key(|(_, entry)| (entry.deadline, entry.seq))
            .map(|(position, _)| position)?;

        let entry = clock.entries.swap_remove(position);
        if entry.deadline > clock.now {
            clock.now = entry.deadline;
        }
        Some(entry)
    }

    fn push(&self, delay: Duration, interval: Option<Duration>, task: TimerTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let mut clock = self.clock.lock();
        let seq = clock.next_seq;
        clock.next_seq += 1;
        let deadline = clock.now + delay;
        clock.entries.push(TimerEntry {
            seq,
            deadline,
            interval,
            task,
            handle: handle.clone(),
        });
        handle
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> Duration {
        self.clock.lock().now
    }

    fn schedule_once(&self, delay: Duration, task: OneShotTask) -> TimerHandle {
        self.push(delay, None, TimerTask::Once(task))
    }

    fn schedule_repeating(&self, interval: Duration, task: RepeatingTask) -> TimerHandle {
        let interval = interval.max(MIN_INTERVAL);
        self.push(interval, Some(interval), TimerTask::Repeating(task))
    }
}

use std::sync::Arc;
use std::time::Duration;

use crate::models::state::PlaybackMode;
use crate::session::events::{EventSender, SeekPurpose, SessionEvent};
use crate::session::stream_pool::StreamPool;
use crate::traits::scheduler::{Scheduler, TimerHandle};

/// What to do once every seek of a batch has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SeekFollowUp {
    pub resume: bool,
}

struct Sampler {
    id: u64,
    index: usize,
    timer: TimerHandle,
}

struct SeekBatch {
    id: u64,
    outstanding: usize,
    follow_up: SeekFollowUp,
}

/// Publishes current time and aggregated duration, and coordinates
/// multi-stream seeks.
///
/// At most one sampler is registered at a time; attaching always detaches
/// the previous one first.
pub struct TimeSynchronizer {
    sampler: Option<Sampler>,
    next_sampler_id: u64,
    batch: Option<SeekBatch>,
    next_batch_id: u64,
    current_time: f64,
    duration: f64,
    duration_observed: bool,
}

impl TimeSynchronizer {
    pub fn new() -> Self {
        Self {
            sampler: None,
            next_sampler_id: 0,
            batch: None,
            next_batch_id: 0,
            current_time: 0.0,
            duration: 0.0,
            duration_observed: false,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub(crate) fn set_current_time(&mut self, time_secs: f64) {
        self.current_time = time_secs;
    }

    /// Index of the stream the sampler reads, if one is attached.
    pub fn sampler_index(&self) -> Option<usize> {
        self.sampler.as_ref().map(|sampler| sampler.index)
    }

    pub fn has_pending_seeks(&self) -> bool {
        self.batch.is_some()
    }

    /// Register the periodic sampler on the stream at `index`.
    pub(crate) fn attach(
        &mut self,
        index: usize,
        generation: uuid::Uuid,
        interval: Duration,
        scheduler: &dyn Scheduler,
        events: &EventSender,
    ) {
        self.detach();

        self.next_sampler_id += 1;
        let id = self.next_sampler_id;
        let ticks = events.clone();
        let timer = scheduler.schedule_repeating(
            interval,
            Arc::new(move || {
                ticks.post(SessionEvent::SampleTick {
                    generation,
                    sampler: id,
                })
            }),
        );

        self.sampler = Some(Sampler { id, index, timer });
    }

    pub(crate) fn detach(&mut self) {
        if let Some(sampler) = self.sampler.take() {
            sampler.timer.cancel();
        }
    }

    /// Take a time sample for `sampler`. Returns whether current time changed.
    /// Ticks from a detached sampler are ignored.
    pub(crate) fn sample(&mut self, sampler: u64, pool: &StreamPool) -> bool {
        let Some(active) = self.sampler.as_ref().filter(|s| s.id == sampler) else {
            return false;
        };
        let Some(time) = pool.stream(active.index).and_then(|stream| stream.current_time()) else {
            return false;
        };
        log::trace!("Sampled {:.3}s from stream {}", time, active.index);

        if time.is_finite() && time != self.current_time {
            self.current_time = time;
            true
        } else {
            false
        }
    }

    /// Seek the driven streams to `time_secs`.
    ///
    /// Multi-angle seeks every playable stream, single-angle only the active
    /// one. Any earlier batch is superseded. Returns `false` when no seek was
    /// issued, in which case the caller runs `follow_up` itself.
    pub(crate) fn seek_all(
        &mut self,
        pool: &mut StreamPool,
        mode: PlaybackMode,
        active_index: usize,
        time_secs: f64,
        tolerance_secs: f64,
        follow_up: SeekFollowUp,
        events: &EventSender,
    ) -> bool {
        self.next_batch_id += 1;
        let id = self.next_batch_id;
        let generation = pool.generation();

        let mut outstanding = 0;
        for (index, stream) in pool.iter_mut().enumerate() {
            if mode.is_single_angle() && index != active_index {
                continue;
            }
            let landed = events.clone();
            let issued = stream.seek(
                time_secs,
                tolerance_secs,
                Box::new(move |finished| {
                    landed.post(SessionEvent::SeekLanded {
                        generation,
                        index,
                        purpose: SeekPurpose::Batch(id),
                        finished,
                    })
                }),
            );
            if issued {
                outstanding += 1;
            }
        }

        if outstanding == 0 {
            self.batch = None;
            return false;
        }
        self.batch = Some(SeekBatch {
            id,
            outstanding,
            follow_up,
        });
        true
    }

    /// Exact seek of every playable stream, with no follow-up.
    pub(crate) fn align_all(&mut self, pool: &mut StreamPool, time_secs: f64, events: &EventSender) {
        let generation = pool.generation();
        for (index, stream) in pool.iter_mut().enumerate() {
            let landed = events.clone();
            stream.seek(
                time_secs,
                0.0,
                Box::new(move |finished| {
                    landed.post(SessionEvent::SeekLanded {
                        generation,
                        index,
                        purpose: SeekPurpose::Align,
                        finished,
                    })
                }),
            );
        }
    }

    /// Record one landed seek of batch `id`. Returns the follow-up once the
    /// last seek of the current batch lands; completions of superseded
    /// batches are discarded.
    pub(crate) fn seek_landed(&mut self, id: u64) -> Option<SeekFollowUp> {
        let batch = self.batch.as_mut().filter(|batch| batch.id == id)?;
        batch.outstanding = batch.outstanding.saturating_sub(1);
        if batch.outstanding > 0 {
            return None;
        }
        self.batch.take().map(|batch| batch.follow_up)
    }

    /// Drop the outstanding batch when its streams were torn down.
    pub(crate) fn cancel_pending_seeks(&mut self) {
        self.batch = None;
    }

    /// Recompute the aggregated duration. Returns whether it changed.
    ///
    /// Multi-angle takes the longest ready stream; single-angle the active
    /// stream. With nothing ready the previous value is kept.
    pub(crate) fn recompute_duration(
        &mut self,
        pool: &StreamPool,
        mode: PlaybackMode,
        active_index: usize,
    ) -> bool {
        let aggregated = match mode {
            PlaybackMode::MultiAngle => pool
                .iter()
                .filter_map(|stream| stream.status().duration())
                .fold(None, |max: Option<f64>, secs| Some(max.map_or(secs, |m| m.max(secs)))),
            PlaybackMode::SingleAngle => pool
                .stream(active_index)
                .and_then(|stream| stream.status().duration()),
        };

        match aggregated {
            Some(duration) if duration.is_finite() => {
                self.duration_observed = true;
                let changed = duration != self.duration;
                self.duration = duration;
                changed
            }
            _ => false,
        }
    }

    /// Apply the probed duration unless a stream already reported one.
    pub(crate) fn apply_duration_hint(&mut self, duration_secs: f64) -> bool {
        if self.duration_observed || !(duration_secs > 0.0) {
            return false;
        }
        log::debug!("Using probed duration {:.3}s until streams are ready", duration_secs);
        let changed = duration_secs != self.duration;
        self.duration = duration_secs;
        changed
    }

    /// Forget time, duration and pending seeks; detaches the sampler.
    pub(crate) fn reset(&mut self) {
        self.detach();
        self.batch = None;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.duration_observed = false;
    }
}

impl Default for TimeSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

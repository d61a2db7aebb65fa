//! Simulated stream handle.
//!
//! The media clock is derived from the backend's `Scheduler`: while playing
//! and ready, position advances by elapsed scheduler time times the rate.
//! Loading, seeking and reaching the end are timers on the same scheduler,
//! so a `ManualScheduler` makes the whole stream deterministic.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use multicam_core::models::stream_models::StreamStatus;
use multicam_core::traits::scheduler::{Scheduler, TimerHandle};
use multicam_core::traits::stream_handle::{
    SeekCompletion, StreamEvent, StreamHandle, StreamObserver,
};

use crate::catalog::MediaScript;

const END_EPSILON: f64 = 1e-6;

/// Observable state of one simulated stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamProbe {
    pub location: String,
    pub status: StreamStatus,
    pub playing: bool,
    pub muted: bool,
    pub rate: f32,
    pub position_secs: f64,
    pub forward_buffer_secs: f64,
    pub seek_in_flight: bool,
    pub seeks_issued: usize,
    pub released: bool,
}

struct PendingSeek {
    id: u64,
    timer: Option<TimerHandle>,
    completion: SeekCompletion,
}

pub(crate) struct SimState {
    location: String,
    script: MediaScript,
    status: StreamStatus,
    playing: bool,
    muted: bool,
    rate: f32,
    forward_buffer_secs: f64,
    /// Media position at scheduler time `anchor`.
    position: f64,
    anchor: Duration,
    next_seek: u64,
    seeks_issued: usize,
    pending_seek: Option<PendingSeek>,
    load_timer: Option<TimerHandle>,
    end_timer: Option<TimerHandle>,
    released: bool,
}

impl SimState {
    fn new(location: String, script: MediaScript, now: Duration) -> Self {
        Self {
            location,
            script,
            status: StreamStatus::Loading,
            playing: false,
            muted: false,
            rate: 1.0,
            forward_buffer_secs: 0.0,
            position: 0.0,
            anchor: now,
            next_seek: 0,
            seeks_issued: 0,
            pending_seek: None,
            load_timer: None,
            end_timer: None,
            released: false,
        }
    }

    fn is_advancing(&self) -> bool {
        self.playing && self.status.is_ready() && !self.released
    }

    fn position_at(&self, now: Duration) -> f64 {
        if !self.is_advancing() {
            return self.position;
        }
        let elapsed = now.saturating_sub(self.anchor).as_secs_f64();
        (self.position + elapsed * f64::from(self.rate)).min(self.script.duration_secs)
    }

    fn rebase(&mut self, now: Duration) {
        self.position = self.position_at(now);
        self.anchor = now;
    }

    /// Scheduler time until the end of media, while advancing.
    fn time_to_end(&self) -> Option<Duration> {
        if !self.is_advancing() || self.rate <= 0.0 {
            return None;
        }
        let remaining = (self.script.duration_secs - self.position).max(0.0);
        Some(Duration::from_secs_f64(remaining / f64::from(self.rate)))
    }

    pub(crate) fn probe(&self, now: Duration) -> StreamProbe {
        StreamProbe {
            location: self.location.clone(),
            status: self.status.clone(),
            playing: self.playing,
            muted: self.muted,
            rate: self.rate,
            position_secs: self.position_at(now),
            forward_buffer_secs: self.forward_buffer_secs,
            seek_in_flight: self.pending_seek.is_some(),
            seeks_issued: self.seeks_issued,
            released: self.released,
        }
    }
}

/// State plus everything a timer task needs to act on it.
///
/// Timers are cancelled only after the state lock is dropped: a running
/// task holds its handle's guard while it locks the state.
#[derive(Clone)]
pub(crate) struct SharedStream {
    pub(crate) state: Arc<Mutex<SimState>>,
    scheduler: Arc<dyn Scheduler>,
    observer: StreamObserver,
}

impl SharedStream {
    fn now(&self) -> Duration {
        self.scheduler.now()
    }

    fn start_loading(&self) {
        let latency = self.state.lock().script.load_latency;
        let shared = self.clone();
        let timer = self
            .scheduler
            .schedule_once(latency, Box::new(move || shared.finish_loading()));
        self.state.lock().load_timer = Some(timer);
    }

    fn finish_loading(&self) {
        let status = {
            let mut state = self.state.lock();
            if state.released {
                return;
            }
            let now = self.now();
            state.rebase(now);
            state.status = state.script.load_outcome();
            state.load_timer = None;
            state.status.clone()
        };
        log::debug!("Simulated stream loaded: {:?}", status);
        (self.observer)(StreamEvent::StatusChanged(status));
        self.reschedule_end();
    }

    fn reschedule_end(&self) {
        let stale = self.state.lock().end_timer.take();
        if let Some(timer) = stale {
            timer.cancel();
        }

        let Some(delay) = self.state.lock().time_to_end() else {
            return;
        };
        let shared = self.clone();
        let timer = self
            .scheduler
            .schedule_once(delay, Box::new(move || shared.reach_end()));
        self.state.lock().end_timer = Some(timer);
    }

    fn reach_end(&self) {
        let ended = {
            let mut state = self.state.lock();
            let now = self.now();
            state.rebase(now);
            let ended = state.is_advancing()
                && state.position >= state.script.duration_secs - END_EPSILON;
            if ended {
                state.playing = false;
            }
            ended
        };
        if ended {
            (self.observer)(StreamEvent::Ended);
        }
    }

    fn land_seek(&self, id: u64) {
        let landed = {
            let mut state = self.state.lock();
            match state.pending_seek.take() {
                Some(pending) if pending.id == id => Some(pending),
                other => {
                    state.pending_seek = other;
                    None
                }
            }
        };
        if let Some(pending) = landed {
            (pending.completion)(true);
        }
    }
}

/// A `StreamHandle` over a scripted media file.
pub struct SimulatedStream {
    shared: SharedStream,
}

impl SimulatedStream {
    pub(crate) fn open(
        location: String,
        script: MediaScript,
        scheduler: Arc<dyn Scheduler>,
        observer: StreamObserver,
    ) -> Self {
        let now = scheduler.now();
        let shared = SharedStream {
            state: Arc::new(Mutex::new(SimState::new(location, script, now))),
            scheduler,
            observer,
        };
        shared.start_loading();
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &SharedStream {
        &self.shared
    }

    /// Change state and keep the end-of-media timer in step with it.
    fn update(&mut self, f: impl FnOnce(&mut SimState)) {
        {
            let mut state = self.shared.state.lock();
            let now = self.shared.now();
            state.rebase(now);
            f(&mut state);
        }
        self.shared.reschedule_end();
    }
}

impl StreamHandle for SimulatedStream {
    fn play(&mut self) {
        self.update(|state| state.playing = true);
    }

    fn pause(&mut self) {
        self.update(|state| state.playing = false);
    }

    fn seek(&mut self, time_secs: f64, tolerance_secs: f64, on_complete: SeekCompletion) {
        let (id, latency, superseded) = {
            let mut state = self.shared.state.lock();
            if state.released {
                drop(state);
                on_complete(false);
                return;
            }
            let now = self.shared.now();
            state.rebase(now);
            state.position = state.script.landing_position(time_secs, tolerance_secs);
            state.next_seek += 1;
            state.seeks_issued += 1;
            let id = state.next_seek;
            let superseded = state.pending_seek.replace(PendingSeek {
                id,
                timer: None,
                completion: on_complete,
            });
            (id, state.script.seek_latency, superseded)
        };

        if let Some(previous) = superseded {
            if let Some(timer) = previous.timer {
                timer.cancel();
            }
            (previous.completion)(false);
        }

        let shared = self.shared.clone();
        let timer = self
            .shared
            .scheduler
            .schedule_once(latency, Box::new(move || shared.land_seek(id)));
        {
            let mut state = self.shared.state.lock();
            if let Some(pending) = state.pending_seek.as_mut().filter(|p| p.id == id) {
                pending.timer = Some(timer);
            }
        }
        self.shared.reschedule_end();
    }

    fn set_muted(&mut self, muted: bool) {
        self.shared.state.lock().muted = muted;
    }

    fn set_rate(&mut self, rate: f32) {
        self.update(|state| state.rate = rate);
    }

    fn set_preferred_forward_buffer(&mut self, secs: f64) {
        self.shared.state.lock().forward_buffer_secs = secs;
    }

    fn current_time(&self) -> f64 {
        let now = self.shared.now();
        self.shared.state.lock().position_at(now)
    }

    fn release(&mut self) {
        let (timers, pending) = {
            let mut state = self.shared.state.lock();
            if state.released {
                return;
            }
            let now = self.shared.now();
            state.rebase(now);
            state.released = true;
            state.playing = false;
            let timers: Vec<TimerHandle> = [state.load_timer.take(), state.end_timer.take()]
                .into_iter()
                .flatten()
                .collect();
            (timers, state.pending_seek.take())
        };

        for timer in timers {
            timer.cancel();
        }
        if let Some(pending) = pending {
            if let Some(timer) = pending.timer {
                timer.cancel();
            }
            (pending.completion)(false);
        }
        log::debug!("Simulated stream released");
    }
}

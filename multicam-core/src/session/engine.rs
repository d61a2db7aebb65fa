use std::sync::Arc;
use std::time::Duration;

use crate::models::config::EngineConfiguration;
use crate::models::error::PlaybackError;
use crate::models::state::{FreezeState, PlaybackMode, PlaybackSnapshot};
use crate::models::stream_models::{StreamMetadata, StreamSource, StreamStatus};
use crate::session::audio_router::AudioRouter;
use crate::session::events::{EventQueue, SeekPurpose, SessionEvent};
use crate::session::freeze::FreezeScheduler;
use crate::session::stream_pool::StreamPool;
use crate::session::time_sync::{SeekFollowUp, TimeSynchronizer};
use crate::traits::playback_delegate::PlaybackDelegate;
use crate::traits::scheduler::{Scheduler, TimerHandle};
use crate::traits::stream_handle::{StreamBackend, StreamEvent};

/// An angle switch whose seek has not landed yet.
#[derive(Debug, Clone, Copy)]
struct PendingSwitch {
    token: u64,
    index: usize,
    resume: bool,
}

/// Delayed resume after re-aligning all angles.
struct PendingSettle {
    token: u64,
    timer: TimerHandle,
}

/// Synchronized multi-angle playback session.
///
/// Owns the stream pool and drives it in multi-angle or single-angle mode.
/// All methods must be called from one owner thread. Asynchronous
/// completions (stream status, landed seeks, sampler ticks, timers) are
/// queued and applied by `process_events`, which the host calls from the
/// same thread, e.g. once per UI frame.
///
/// ```text
/// setup ─→ [StreamPool] ─→ [AudioRouter] mutes all but active
///                 │
///                 └─→ [TimeSynchronizer] samples active, aggregates duration
/// play/pause/seek/switch ─→ mode rules ─→ pool / router / synchronizer
/// freeze_for ─→ [FreezeScheduler] timed pause ─→ play path on expiry
/// ```
pub struct MultiAngleSession {
    backend: Arc<dyn StreamBackend>,
    scheduler: Arc<dyn Scheduler>,
    config: EngineConfiguration,
    delegate: Option<Arc<dyn PlaybackDelegate>>,
    events: EventQueue,

    pool: StreamPool,
    router: AudioRouter,
    sync: TimeSynchronizer,
    freeze: FreezeScheduler,

    mode: PlaybackMode,
    active_index: usize,
    is_playing: bool,
    rate: f32,

    pending_switch: Option<PendingSwitch>,
    settle: Option<PendingSettle>,
    next_transition: u64,

    last_published: Option<PlaybackSnapshot>,
}

impl MultiAngleSession {
    pub fn new(
        backend: Arc<dyn StreamBackend>,
        scheduler: Arc<dyn Scheduler>,
        config: EngineConfiguration,
    ) -> Result<Self, PlaybackError> {
        config.validate().map_err(PlaybackError::InvalidConfiguration)?;

        Ok(Self {
            backend,
            scheduler,
            mode: config.initial_mode,
            rate: config.default_rate,
            config,
            delegate: None,
            events: EventQueue::new(),
            pool: StreamPool::new(),
            router: AudioRouter::new(),
            sync: TimeSynchronizer::new(),
            freeze: FreezeScheduler::new(),
            active_index: 0,
            is_playing: false,
            pending_switch: None,
            settle: None,
            next_transition: 0,
            last_published: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn PlaybackDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn configuration(&self) -> &EngineConfiguration {
        &self.config
    }

    // --- Published state ---

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            is_frozen: self.freeze.is_active(),
            current_time: self.sync.current_time(),
            duration: self.sync.duration(),
            playback_rate: self.rate,
            active_index: self.active_index(),
            mode: self.mode,
            stream_count: self.pool.len(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.sync.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.sync.duration()
    }

    pub fn playback_rate(&self) -> f32 {
        self.rate
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Active angle, or `None` while the pool is empty.
    pub fn active_index(&self) -> Option<usize> {
        (!self.pool.is_empty()).then_some(self.active_index)
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_active()
    }

    pub fn freeze_state(&self) -> Option<FreezeState> {
        self.freeze.state()
    }

    pub fn stream_count(&self) -> usize {
        self.pool.len()
    }

    pub fn stream_status(&self, index: usize) -> Option<&StreamStatus> {
        self.pool.stream(index).map(|stream| stream.status())
    }

    pub fn stream_metadata(&self, index: usize) -> Option<&StreamMetadata> {
        self.pool.stream(index).and_then(|stream| stream.metadata())
    }

    pub fn is_stream_muted(&self, index: usize) -> Option<bool> {
        self.pool.stream(index).map(|stream| stream.is_muted())
    }

    pub fn is_stream_playing(&self, index: usize) -> Option<bool> {
        self.pool.stream(index).map(|stream| stream.is_playing())
    }

    /// The single unmuted stream, if exactly one is unmuted.
    pub fn audible_index(&self) -> Option<usize> {
        AudioRouter::audible_index(&self.pool)
    }

    /// Stream currently read by the time sampler.
    pub fn sampled_index(&self) -> Option<usize> {
        self.sync.sampler_index()
    }

    /// Whether an angle switch is waiting for its seek to land.
    pub fn is_switching(&self) -> bool {
        self.pending_switch.is_some()
    }

    // --- Pool lifecycle ---

    /// Load one stream per source, replacing the current pool.
    ///
    /// A no-op when the pool already holds exactly these sources in this
    /// order. Returns once every stream exists; readiness arrives later
    /// through `process_events`.
    pub fn setup<I, S>(&mut self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<StreamSource>,
    {
        let sources: Vec<StreamSource> = sources.into_iter().map(Into::into).collect();
        if self.pool.holds(&sources) {
            log::debug!("Setup skipped: pool already holds these {} sources", sources.len());
            return;
        }

        self.teardown();
        if sources.is_empty() {
            return;
        }

        if self.active_index >= sources.len() {
            self.active_index = 0;
        }
        let count = sources.len();
        let failures = self.pool.populate(
            sources,
            &self.backend,
            self.config.preferred_forward_buffer_secs,
            self.active_index,
            &self.events.sender(),
        );
        for (index, error) in &failures {
            self.notify_degraded(*index, error);
        }

        self.attach_sampler(self.active_index);
        self.router.apply_mute(&mut self.pool, self.active_index);
        self.sync.recompute_duration(&self.pool, self.mode, self.active_index);

        log::info!(
            "Loaded {} streams ({} failed), active angle {}",
            count,
            failures.len(),
            self.active_index
        );
        self.publish();
    }

    /// Stop sampling, cancel any freeze, and release every stream.
    ///
    /// Safe to call repeatedly; does nothing when already empty.
    pub fn teardown(&mut self) {
        self.sync.detach();
        self.sync.cancel_pending_seeks();
        if self.freeze.cancel() {
            self.notify_freeze(false);
        }
        self.cancel_settle();
        self.pending_switch = None;

        if self.pool.is_empty() {
            return;
        }

        let count = self.pool.len();
        self.pool.teardown();
        self.sync.reset();
        self.is_playing = false;
        log::info!("Released {} streams", count);
        self.publish();
    }

    // --- Transport ---

    /// Start playback of the driven streams. Cancels a running freeze.
    pub fn play(&mut self) {
        if self.pool.is_empty() {
            log::debug!("Play ignored: no streams loaded");
            return;
        }
        if self.freeze.cancel() {
            self.notify_freeze(false);
        }
        self.cancel_settle();

        if let Some(pending) = self.pending_switch.as_mut() {
            // The switch's landed seek starts the new angle.
            pending.resume = true;
            self.is_playing = true;
            self.publish();
            return;
        }

        self.start_playback();
        self.route_audio();
        self.publish();
    }

    /// Pause every stream. Cancels a running freeze without resuming.
    pub fn pause(&mut self) {
        if self.freeze.cancel() {
            self.notify_freeze(false);
        }
        self.cancel_settle();
        if let Some(pending) = self.pending_switch.as_mut() {
            pending.resume = false;
        }

        self.pause_streams();
        self.is_playing = false;
        self.publish();
    }

    pub fn set_rate(&mut self, rate: f32) {
        if !(rate.is_finite() && rate > 0.0) {
            log::debug!("Rate {} ignored", rate);
            return;
        }
        self.rate = rate;
        for stream in self.pool.iter_mut().filter(|stream| stream.is_playing()) {
            stream.set_rate(rate);
        }
        self.publish();
    }

    /// Seek the driven streams, resuming once they land if playing.
    ///
    /// Multi-angle seeks all angles with the loose tolerance and waits for
    /// every one; single-angle seeks the active angle with the tight one.
    /// Seeking cancels a running freeze.
    pub fn seek(&mut self, time_secs: f64) {
        if self.pool.is_empty() {
            log::debug!("Seek ignored: no streams loaded");
            return;
        }
        if !time_secs.is_finite() {
            log::debug!("Seek to {} ignored", time_secs);
            return;
        }
        if self.freeze.cancel() {
            self.notify_freeze(false);
        }
        self.cancel_settle();

        let tolerance = self.config.seek_tolerance(self.mode);
        self.seek_driven(time_secs, tolerance, self.is_playing);
        self.publish();
    }

    /// Pause and step `count` frames of the active angle (negative steps
    /// backwards). Needs the active stream's frame rate.
    pub fn step_frames(&mut self, count: i32) {
        if count == 0 || self.pool.is_empty() {
            return;
        }
        let frame_rate = self
            .pool
            .stream(self.active_index)
            .and_then(|stream| stream.metadata())
            .map(|metadata| metadata.frame_rate)
            .filter(|rate| rate.is_finite() && *rate > 0.0);
        let Some(frame_rate) = frame_rate else {
            log::debug!("Frame step ignored: active stream has no frame rate");
            return;
        };

        self.pause();
        let target = self.sync.current_time() + f64::from(count) / frame_rate;
        self.seek_driven(target, 0.0, false);
        self.publish();
    }

    // --- Mode and angle ---

    /// Enter single-angle (`true`) or multi-angle (`false`) mode.
    pub fn set_single_angle(&mut self, enabled: bool) {
        let mode = if enabled {
            PlaybackMode::SingleAngle
        } else {
            PlaybackMode::MultiAngle
        };
        self.set_mode(mode);
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        if mode == self.mode {
            return;
        }
        self.cancel_settle();
        self.mode = mode;

        if self.pool.is_empty() {
            log::debug!("Mode set to {:?} with no streams loaded", mode);
            self.publish();
            return;
        }

        match mode {
            PlaybackMode::SingleAngle => {
                let active = self.active_index;
                for (index, stream) in self.pool.iter_mut().enumerate() {
                    if index != active {
                        stream.pause();
                    }
                }
            }
            PlaybackMode::MultiAngle => {
                let time = self.sync.current_time();
                self.sync.align_all(&mut self.pool, time, &self.events.sender());
                if self.is_playing && self.pending_switch.is_none() {
                    self.schedule_settle();
                }
            }
        }

        self.sync.recompute_duration(&self.pool, self.mode, self.active_index);
        self.route_audio();
        log::info!("Entered {:?} mode on angle {}", mode, self.active_index);
        self.publish();
    }

    /// Make `index` the active angle.
    ///
    /// The new angle is seeked to the current time; audio routing and
    /// resumption happen once that seek lands, and only if no later switch
    /// superseded it. Until then no stream is audible.
    pub fn switch_active_angle(&mut self, index: usize) {
        if index >= self.pool.len() {
            log::debug!(
                "Switch to angle {} ignored: pool holds {} streams",
                index,
                self.pool.len()
            );
            return;
        }
        if index == self.active_index {
            return;
        }

        let previous = self.active_index;
        let resume = self.is_playing;

        self.router.mute_all(&mut self.pool);
        if self.mode.is_single_angle() {
            if let Some(stream) = self.pool.stream_mut(previous) {
                stream.pause();
            }
        }
        self.sync.detach();
        self.active_index = index;

        self.next_transition += 1;
        let token = self.next_transition;
        self.pending_switch = Some(PendingSwitch {
            token,
            index,
            resume,
        });

        let generation = self.pool.generation();
        let tolerance = self.config.seek_tolerance(self.mode);
        let time = self.sync.current_time();
        let landed = self.events.sender();
        let issued = self.pool.stream_mut(index).is_some_and(|stream| {
            stream.seek(
                time,
                tolerance,
                Box::new(move |finished| {
                    landed.post(SessionEvent::SeekLanded {
                        generation,
                        index,
                        purpose: SeekPurpose::Switch(token),
                        finished,
                    })
                }),
            )
        });

        self.attach_sampler(index);
        self.sync.recompute_duration(&self.pool, self.mode, self.active_index);
        log::info!("Switching angle {} -> {}", previous, index);

        if !issued {
            // Nothing to wait for on a failed stream.
            self.finish_switch(token, index);
        }
        self.publish();
    }

    /// Choose the audible angle.
    ///
    /// In single-angle mode this is an angle switch. In multi-angle mode all
    /// angles keep playing; only audio routing and time sampling move.
    pub fn set_audio_source(&mut self, index: usize) {
        if self.mode.is_single_angle() {
            self.switch_active_angle(index);
            return;
        }
        if index >= self.pool.len() {
            log::debug!(
                "Audio source {} ignored: pool holds {} streams",
                index,
                self.pool.len()
            );
            return;
        }

        // A switch begun in single-angle mode may still owe a resume.
        let superseded = self.pending_switch.take();
        if index != self.active_index {
            self.active_index = index;
            self.attach_sampler(index);
            self.sync.recompute_duration(&self.pool, self.mode, self.active_index);
        }
        if superseded.is_some_and(|pending| pending.resume) && self.is_playing {
            self.start_playback();
        }
        self.route_audio();
        self.publish();
    }

    // --- Freeze ---

    /// Force a pause for `secs`, then resume if playback was active.
    ///
    /// Ignored while a freeze is running, for non-positive durations, and on
    /// an empty pool.
    pub fn freeze_for(&mut self, secs: f64) {
        if !(secs.is_finite() && secs > 0.0) {
            log::debug!("Freeze of {}s ignored", secs);
            return;
        }
        if self.freeze.is_active() {
            log::debug!("Freeze ignored: already frozen");
            return;
        }
        if self.pool.is_empty() {
            log::debug!("Freeze ignored: no streams loaded");
            return;
        }

        let was_playing = self.is_playing;
        let began = self.freeze.begin(
            Duration::from_secs_f64(secs),
            was_playing,
            self.scheduler.as_ref(),
            &self.events.sender(),
        );
        if !began {
            return;
        }

        self.cancel_settle();
        if let Some(pending) = self.pending_switch.as_mut() {
            pending.resume = false;
        }
        self.pause_streams();
        self.is_playing = false;

        log::info!("Frozen for {:.2}s (was playing: {})", secs, was_playing);
        self.notify_freeze(true);
        self.publish();
    }

    /// Clear a running freeze without resuming playback.
    pub fn cancel_freeze(&mut self) {
        if self.freeze.cancel() {
            log::info!("Freeze cancelled");
            self.notify_freeze(false);
            self.publish();
        }
    }

    // --- Host application events ---

    /// The application lost focus: pause everything.
    pub fn focus_lost(&mut self) {
        self.pause();
    }

    /// The application regained focus: restore audio routing.
    pub fn focus_regained(&mut self) {
        self.route_audio();
        self.publish();
    }

    // --- Event processing ---

    /// Apply every queued completion. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.events.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        if handled > 0 {
            self.publish();
        }
        handled
    }

    /// Number of completions waiting for `process_events`.
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    fn handle_event(&mut self, event: SessionEvent) {
        let current = self.pool.generation();
        match event {
            SessionEvent::Stream {
                generation,
                index,
                event,
            } if generation == current => self.handle_stream_event(index, event),
            SessionEvent::SeekLanded {
                generation,
                index,
                purpose,
                finished,
            } if generation == current => self.handle_seek_landed(index, purpose, finished),
            SessionEvent::SampleTick {
                generation,
                sampler,
            } if generation == current => {
                if self.pending_switch.is_none() && !self.sync.has_pending_seeks() {
                    self.sync.sample(sampler, &self.pool);
                }
            }
            SessionEvent::DurationHint {
                generation,
                duration_secs,
            } if generation == current => {
                self.sync.apply_duration_hint(duration_secs);
            }
            SessionEvent::FreezeExpired { freeze } => {
                if let Some(state) = self.freeze.expire(freeze) {
                    log::info!("Freeze expired (resuming: {})", state.was_playing_before_freeze);
                    self.notify_freeze(false);
                    if state.was_playing_before_freeze {
                        self.play();
                    }
                }
            }
            SessionEvent::SettleElapsed {
                generation,
                transition,
            } if generation == current => {
                let due = self
                    .settle
                    .as_ref()
                    .is_some_and(|settle| settle.token == transition);
                if due {
                    self.settle = None;
                    if self.is_playing && !self.mode.is_single_angle() {
                        self.start_playback();
                        self.route_audio();
                    }
                }
            }
            stale => log::debug!("Discarded stale event: {:?}", stale),
        }
    }

    fn handle_stream_event(&mut self, index: usize, event: StreamEvent) {
        match event {
            StreamEvent::StatusChanged(status) => {
                let Some(stream) = self.pool.stream_mut(index) else {
                    return;
                };
                if let StreamStatus::Failed(reason) = &status {
                    let error = PlaybackError::LoadFailed {
                        source_id: stream.source().location().to_string(),
                        reason: reason.clone(),
                    };
                    log::warn!("Stream {} degraded: {}", index, error);
                    stream.pause();
                    stream.set_status(status);
                    self.notify_degraded(index, &error);
                } else {
                    stream.set_status(status);
                }
                self.sync.recompute_duration(&self.pool, self.mode, self.active_index);
            }
            StreamEvent::Ended => {
                if index == self.active_index && self.is_playing {
                    log::info!("Active stream {} reached its end", index);
                    self.pause_streams();
                    self.is_playing = false;
                } else {
                    log::debug!("Stream {} reached its end", index);
                }
            }
        }
    }

    fn handle_seek_landed(&mut self, index: usize, purpose: SeekPurpose, finished: bool) {
        match purpose {
            SeekPurpose::Batch(id) => {
                if let Some(follow_up) = self.sync.seek_landed(id) {
                    self.run_seek_follow_up(follow_up);
                }
            }
            SeekPurpose::Switch(token) => self.finish_switch(token, index),
            SeekPurpose::Align => {
                log::trace!("Stream {} aligned (finished: {})", index, finished);
            }
        }
    }

    // --- Internal helpers ---

    fn finish_switch(&mut self, token: u64, index: usize) {
        let current = match self.pending_switch {
            Some(pending) if pending.token == token && self.active_index == index => pending,
            _ => {
                log::debug!("Discarded superseded switch to angle {}", index);
                return;
            }
        };
        self.pending_switch = None;

        if current.resume && self.is_playing {
            self.start_playback();
        }
        self.route_audio();
    }

    fn run_seek_follow_up(&mut self, follow_up: SeekFollowUp) {
        if follow_up.resume && self.is_playing && self.pending_switch.is_none() {
            self.start_playback();
        }
        self.route_audio();
    }

    /// Seek the driven streams to `time_secs` clamped to the known duration,
    /// pausing them meanwhile when `resume` is set.
    fn seek_driven(&mut self, time_secs: f64, tolerance: f64, resume: bool) {
        let duration = self.sync.duration();
        let mut target = time_secs.max(0.0);
        if duration > 0.0 {
            target = target.min(duration);
        }

        if resume {
            self.pause_streams();
        }
        self.sync.set_current_time(target);

        let follow_up = SeekFollowUp { resume };
        let pending = self.sync.seek_all(
            &mut self.pool,
            self.mode,
            self.active_index,
            target,
            tolerance,
            follow_up,
            &self.events.sender(),
        );
        if !pending {
            self.run_seek_follow_up(follow_up);
        }
    }

    /// The single play path: drive streams according to the mode.
    fn start_playback(&mut self) {
        if self.pool.is_empty() {
            return;
        }
        self.is_playing = true;
        let rate = self.rate;
        let active = self.active_index;
        let single = self.mode.is_single_angle();

        for (index, stream) in self.pool.iter_mut().enumerate() {
            if single && index != active {
                stream.pause();
            } else {
                stream.play(rate);
            }
        }
    }

    fn pause_streams(&mut self) {
        for stream in self.pool.iter_mut() {
            stream.pause();
        }
    }

    /// Re-apply audio routing unless a switch is still seeking.
    fn route_audio(&mut self) {
        if self.pending_switch.is_none() {
            self.router.apply_mute(&mut self.pool, self.active_index);
        }
    }

    fn attach_sampler(&mut self, index: usize) {
        self.sync.attach(
            index,
            self.pool.generation(),
            self.config.sampling_interval(),
            self.scheduler.as_ref(),
            &self.events.sender(),
        );
    }

    fn schedule_settle(&mut self) {
        self.cancel_settle();
        self.next_transition += 1;
        let token = self.next_transition;
        let generation = self.pool.generation();
        let elapsed = self.events.sender();
        let timer = self.scheduler.schedule_once(
            self.config.resume_settle_delay(),
            Box::new(move || {
                elapsed.post(SessionEvent::SettleElapsed {
                    generation,
                    transition: token,
                })
            }),
        );
        self.settle = Some(PendingSettle { token, timer });
    }

    fn cancel_settle(&mut self) {
        if let Some(settle) = self.settle.take() {
            settle.timer.cancel();
        }
    }

    fn notify_degraded(&self, index: usize, error: &PlaybackError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_stream_degraded(index, error);
        }
    }

    fn notify_freeze(&self, frozen: bool) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_freeze_changed(frozen);
        }
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        if self.last_published.as_ref() == Some(&snapshot) {
            return;
        }
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&snapshot);
        }
        self.last_published = Some(snapshot);
    }
}

impl Drop for MultiAngleSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

//! Recording fake backend shared by the unit tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::PlaybackError;
use crate::models::state::PlaybackSnapshot;
use crate::models::stream_models::{StreamMetadata, StreamSource, StreamStatus};
use crate::traits::playback_delegate::PlaybackDelegate;
use crate::traits::stream_handle::{
    SeekCompletion, StreamBackend, StreamEvent, StreamHandle, StreamObserver,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeStreamState {
    pub location: String,
    pub muted: bool,
    pub playing: bool,
    pub rate: f32,
    pub time: f64,
    pub forward_buffer: f64,
    pub seeks: Vec<(f64, f64)>,
    pub play_calls: usize,
    pub unmutes: usize,
    pub released: bool,
}

struct HeldSeek {
    stream: usize,
    completion: SeekCompletion,
}

/// Backend whose streams record every instruction and whose seek
/// completions are held until the test releases them.
pub(crate) struct FakeBackend {
    states: Mutex<Vec<Arc<Mutex<FakeStreamState>>>>,
    observers: Mutex<Vec<StreamObserver>>,
    held: Arc<Mutex<Vec<HeldSeek>>>,
    failing: Vec<String>,
    probe: Option<f64>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), None))
    }

    pub fn failing_on(locations: &[&str]) -> Arc<Self> {
        Arc::new(Self::build(
            locations.iter().map(|l| l.to_string()).collect(),
            None,
        ))
    }

    pub fn with_probe(duration_secs: f64) -> Arc<Self> {
        Arc::new(Self::build(Vec::new(), Some(duration_secs)))
    }

    fn build(failing: Vec<String>, probe: Option<f64>) -> Self {
        Self {
            states: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            held: Arc::new(Mutex::new(Vec::new())),
            failing,
            probe,
        }
    }

    /// Total number of `open` calls that produced a stream.
    pub fn opened(&self) -> usize {
        self.states.lock().len()
    }

    /// State of the `n`th opened stream.
    pub fn state(&self, n: usize) -> FakeStreamState {
        self.states.lock()[n].lock().clone()
    }

    pub fn set_time(&self, n: usize, time: f64) {
        self.states.lock()[n].lock().time = time;
    }

    /// Change a stream's mute flag behind the engine's back.
    pub fn force_muted(&self, n: usize, muted: bool) {
        self.states.lock()[n].lock().muted = muted;
    }

    pub fn emit(&self, n: usize, event: StreamEvent) {
        let observer = Arc::clone(&self.observers.lock()[n]);
        observer(event);
    }

    pub fn report_ready(&self, n: usize, duration_secs: f64) {
        self.emit(
            n,
            StreamEvent::StatusChanged(StreamStatus::Ready(StreamMetadata {
                duration_secs,
                frame_rate: 25.0,
                width: 1920,
                height: 1080,
                codec: "h264".into(),
            })),
        );
    }

    pub fn report_failed(&self, n: usize, reason: &str) {
        self.emit(n, StreamEvent::StatusChanged(StreamStatus::Failed(reason.into())));
    }

    pub fn held_seeks(&self) -> usize {
        self.held.lock().len()
    }

    /// Release held completions of stream `n`, oldest first.
    pub fn complete_seeks_of(&self, n: usize) {
        let released: Vec<HeldSeek> = {
            let mut held = self.held.lock();
            let (mine, rest): (Vec<_>, Vec<_>) = held.drain(..).partition(|seek| seek.stream == n);
            *held = rest;
            mine
        };
        for seek in released {
            (seek.completion)(true);
        }
    }

    /// Release every held completion, oldest first.
    pub fn complete_all_seeks(&self) {
        let released: Vec<HeldSeek> = self.held.lock().drain(..).collect();
        for seek in released {
            (seek.completion)(true);
        }
    }
}

impl StreamBackend for FakeBackend {
    fn open(
        &self,
        source: &StreamSource,
        observer: StreamObserver,
    ) -> Result<Box<dyn StreamHandle>, PlaybackError> {
        if self.failing.iter().any(|l| l == source.location()) {
            return Err(PlaybackError::SourceUnavailable(source.location().to_string()));
        }

        let state = Arc::new(Mutex::new(FakeStreamState {
            location: source.location().to_string(),
            rate: 1.0,
            ..Default::default()
        }));
        let mut states = self.states.lock();
        let id = states.len();
        states.push(Arc::clone(&state));
        self.observers.lock().push(observer);

        Ok(Box::new(FakeHandle {
            id,
            state,
            held: Arc::clone(&self.held),
        }))
    }

    fn probe_duration(&self, _source: &StreamSource) -> Option<f64> {
        self.probe
    }
}

struct FakeHandle {
    id: usize,
    state: Arc<Mutex<FakeStreamState>>,
    held: Arc<Mutex<Vec<HeldSeek>>>,
}

impl StreamHandle for FakeHandle {
    fn play(&mut self) {
        let mut state = self.state.lock();
        state.playing = true;
        state.play_calls += 1;
    }

    fn pause(&mut self) {
        self.state.lock().playing = false;
    }

    fn seek(&mut self, time_secs: f64, tolerance_secs: f64, on_complete: SeekCompletion) {
        {
            let mut state = self.state.lock();
            state.time = time_secs;
            state.seeks.push((time_secs, tolerance_secs));
        }
        self.held.lock().push(HeldSeek {
            stream: self.id,
            completion: on_complete,
        });
    }

    fn set_muted(&mut self, muted: bool) {
        let mut state = self.state.lock();
        state.muted = muted;
        if !muted {
            state.unmutes += 1;
        }
    }

    fn set_rate(&mut self, rate: f32) {
        self.state.lock().rate = rate;
    }

    fn set_preferred_forward_buffer(&mut self, secs: f64) {
        self.state.lock().forward_buffer = secs;
    }

    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn release(&mut self) {
        self.state.lock().released = true;
    }
}

/// Delegate that records every notification.
#[derive(Default)]
pub(crate) struct RecordingDelegate {
    pub snapshots: Mutex<Vec<PlaybackSnapshot>>,
    pub degraded: Mutex<Vec<(usize, PlaybackError)>>,
    pub freezes: Mutex<Vec<bool>>,
}

impl PlaybackDelegate for RecordingDelegate {
    fn on_state_changed(&self, snapshot: &PlaybackSnapshot) {
        self.snapshots.lock().push(snapshot.clone());
    }

    fn on_stream_degraded(&self, index: usize, error: &PlaybackError) {
        self.degraded.lock().push((index, error.clone()));
    }

    fn on_freeze_changed(&self, frozen: bool) {
        self.freezes.lock().push(frozen);
    }
}

pub(crate) fn sources(count: usize) -> Vec<StreamSource> {
    (0..count)
        .map(|i| StreamSource::new(format!("angle-{}.mp4", i)))
        .collect()
}

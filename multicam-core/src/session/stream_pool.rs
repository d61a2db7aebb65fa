use std::sync::Arc;
use std::thread;

use uuid::Uuid;

use crate::models::error::PlaybackError;
use crate::models::stream_models::{StreamMetadata, StreamSource, StreamStatus};
use crate::session::events::{EventSender, SessionEvent};
use crate::traits::stream_handle::{SeekCompletion, StreamBackend, StreamEvent, StreamHandle};

/// One camera angle owned by the pool.
///
/// Records the last instruction given to the handle (muted, playing) so the
/// engine's invariants can be checked without asking the backend.
pub struct Stream {
    source: StreamSource,
    handle: Option<Box<dyn StreamHandle>>,
    status: StreamStatus,
    muted: bool,
    playing: bool,
}

impl Stream {
    fn opened(source: StreamSource, handle: Box<dyn StreamHandle>) -> Self {
        Self {
            source,
            handle: Some(handle),
            status: StreamStatus::Loading,
            muted: true,
            playing: false,
        }
    }

    fn unavailable(source: StreamSource, reason: String) -> Self {
        Self {
            source,
            handle: None,
            status: StreamStatus::Failed(reason),
            muted: true,
            playing: false,
        }
    }

    pub fn source(&self) -> &StreamSource {
        &self.source
    }

    pub fn status(&self) -> &StreamStatus {
        &self.status
    }

    pub fn metadata(&self) -> Option<&StreamMetadata> {
        self.status.metadata()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether the stream was last instructed to play.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// A stream takes part in playback and seek fan-out unless it failed.
    pub fn is_playable(&self) -> bool {
        self.handle.is_some() && !self.status.is_failed()
    }

    pub fn current_time(&self) -> Option<f64> {
        self.handle.as_ref().map(|handle| handle.current_time())
    }

    pub(crate) fn set_status(&mut self, status: StreamStatus) {
        self.status = status;
    }

    pub(crate) fn play(&mut self, rate: f32) {
        if !self.is_playable() {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.set_rate(rate);
            handle.play();
            self.playing = true;
        }
    }

    pub(crate) fn pause(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
        }
        self.playing = false;
    }

    pub(crate) fn set_rate(&mut self, rate: f32) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_rate(rate);
        }
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        if let Some(handle) = self.handle.as_mut() {
            handle.set_muted(muted);
        }
        self.muted = muted;
    }

    /// Issue a seek. Returns `false` (and drops `on_complete`) when the
    /// stream cannot seek.
    pub(crate) fn seek(&mut self, time_secs: f64, tolerance_secs: f64, on_complete: SeekCompletion) -> bool {
        if !self.is_playable() {
            return false;
        }
        match self.handle.as_mut() {
            Some(handle) => {
                handle.seek(time_secs, tolerance_secs, on_complete);
                true
            }
            None => false,
        }
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.pause();
            handle.release();
        }
        self.playing = false;
    }
}

/// Ordered collection of the session's streams.
///
/// Index is identity for the lifetime of one population. Each population
/// gets a fresh generation id; asynchronous events tagged with an older
/// generation are stale.
pub struct StreamPool {
    streams: Vec<Stream>,
    sources: Vec<StreamSource>,
    generation: Uuid,
}

impl StreamPool {
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
            sources: Vec::new(),
            generation: Uuid::nil(),
        }
    }

    /// Whether the pool already holds exactly `sources`, in order.
    pub fn holds(&self, sources: &[StreamSource]) -> bool {
        self.sources == sources
    }

    pub fn generation(&self) -> Uuid {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// The stream at `index`, or `None` when out of range.
    pub fn stream(&self, index: usize) -> Option<&Stream> {
        self.streams.get(index)
    }

    pub(crate) fn stream_mut(&mut self, index: usize) -> Option<&mut Stream> {
        self.streams.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stream> {
        self.streams.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stream> {
        self.streams.iter_mut()
    }

    /// Create one stream per source. The pool must be empty.
    ///
    /// Spawns the off-thread duration probe, whose result arrives later as a
    /// `DurationHint`. Returns the sources that could not be opened.
    pub(crate) fn populate(
        &mut self,
        sources: Vec<StreamSource>,
        backend: &Arc<dyn StreamBackend>,
        forward_buffer_secs: f64,
        active_index: usize,
        events: &EventSender,
    ) -> Vec<(usize, PlaybackError)> {
        debug_assert!(self.streams.is_empty());

        self.generation = Uuid::new_v4();
        spawn_duration_probe(self.generation, sources.clone(), Arc::clone(backend), events.clone());

        let mut failures = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            let observer = {
                let events = events.clone();
                let generation = self.generation;
                Arc::new(move |event: StreamEvent| {
                    events.post(SessionEvent::Stream {
                        generation,
                        index,
                        event,
                    })
                })
            };

            let stream = match backend.open(source, observer) {
                Ok(mut handle) => {
                    handle.set_preferred_forward_buffer(forward_buffer_secs);
                    let mut stream = Stream::opened(source.clone(), handle);
                    stream.set_muted(index != active_index);
                    stream
                }
                Err(e) => {
                    log::warn!("Stream {} ({}) failed to open: {}", index, source.location(), e);
                    let stream = Stream::unavailable(source.clone(), e.to_string());
                    failures.push((index, e));
                    stream
                }
            };
            self.streams.push(stream);
        }

        self.sources = sources;
        failures
    }

    /// Pause and release every stream and forget the loaded sources.
    /// Does nothing on an empty pool.
    pub(crate) fn teardown(&mut self) {
        if self.streams.is_empty() && self.sources.is_empty() {
            return;
        }
        for stream in self.streams.iter_mut() {
            stream.release();
        }
        self.streams.clear();
        self.sources.clear();
        self.generation = Uuid::nil();
    }
}

impl Default for StreamPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Ask the backend for the longest source duration off the owner thread.
fn spawn_duration_probe(
    generation: Uuid,
    sources: Vec<StreamSource>,
    backend: Arc<dyn StreamBackend>,
    events: EventSender,
) {
    let spawned = thread::Builder::new()
        .name("multicam-duration-probe".into())
        .spawn(move || {
            let longest = sources
                .iter()
                .filter_map(|source| backend.probe_duration(source))
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .fold(None, |max: Option<f64>, secs| Some(max.map_or(secs, |m| m.max(secs))));

            if let Some(duration_secs) = longest {
                events.post(SessionEvent::DurationHint {
                    generation,
                    duration_secs,
                });
            }
        });

    if let Err(e) = spawned {
        log::warn!("Duration probe not started: {}", e);
    }
}

use std::sync::Arc;

use crate::models::error::PlaybackError;
use crate::models::stream_models::{StreamSource, StreamStatus};

/// Notification a stream delivers after it has been opened.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Load status changed (ready with metadata, or failed).
    StatusChanged(StreamStatus),
    /// Playback reached the end of the media.
    Ended,
}

/// Callback through which a backend reports `StreamEvent`s.
///
/// May be invoked from any thread; the engine only enqueues the event.
pub type StreamObserver = Arc<dyn Fn(StreamEvent) + Send + Sync + 'static>;

/// Callback invoked once when a seek lands. The flag is `false` when the
/// seek was interrupted by a later one.
pub type SeekCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// One opened, independently playable camera angle.
///
/// Implemented by concrete media backends. All methods are called from the
/// session's owner thread.
pub trait StreamHandle: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Seek to `time_secs`, accepting a landing position within
    /// `tolerance_secs` either side. `on_complete` must be invoked exactly once.
    fn seek(&mut self, time_secs: f64, tolerance_secs: f64, on_complete: SeekCompletion);

    fn set_muted(&mut self, muted: bool);

    fn set_rate(&mut self, rate: f32);

    /// Read-ahead budget in seconds.
    fn set_preferred_forward_buffer(&mut self, secs: f64);

    /// Position of the stream's own clock in seconds.
    fn current_time(&self) -> f64;

    /// Stop delivering events and free the underlying media resource.
    fn release(&mut self);
}

/// Factory for `StreamHandle`s.
pub trait StreamBackend: Send + Sync {
    /// Open `source`. Readiness is reported later through `observer`.
    fn open(
        &self,
        source: &StreamSource,
        observer: StreamObserver,
    ) -> Result<Box<dyn StreamHandle>, PlaybackError>;

    /// Best-effort duration lookup without opening a full stream.
    ///
    /// Called off the owner thread; may block.
    fn probe_duration(&self, source: &StreamSource) -> Option<f64>;
}

use crate::models::error::PlaybackError;
use crate::models::state::PlaybackSnapshot;

/// Event delegate for playback session notifications.
///
/// All methods are called from the session's owner thread, inside the
/// public operation or `process_events` call that caused the change.
pub trait PlaybackDelegate: Send + Sync {
    /// Called whenever any field of the published snapshot changes.
    fn on_state_changed(&self, snapshot: &PlaybackSnapshot);

    /// Called when a stream fails and is excluded from playback.
    fn on_stream_degraded(&self, index: usize, error: &PlaybackError);

    /// Called when a freeze begins and ends (expiry or cancellation).
    fn on_freeze_changed(&self, frozen: bool) {
        let _ = frozen;
    }
}

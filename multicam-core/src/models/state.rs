use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which streams the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// All streams play in lockstep; the active one is audible.
    #[default]
    MultiAngle,
    /// Only the active stream plays; the rest are paused and muted.
    SingleAngle,
}

impl PlaybackMode {
    pub fn is_single_angle(&self) -> bool {
        matches!(self, Self::SingleAngle)
    }
}

/// A timed forced pause in progress.
///
/// Exists only while a freeze is active; dropped on expiry or cancellation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeState {
    /// Scheduler-clock instant at which the freeze expires.
    pub scheduled_resume_at: Duration,
    pub was_playing_before_freeze: bool,
}

/// Observable state published to the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_frozen: bool,
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: f32,
    pub active_index: Option<usize>,
    pub mode: PlaybackMode,
    pub stream_count: usize,
}

impl PlaybackSnapshot {
    /// JSON payload for forwarding to a UI bridge.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

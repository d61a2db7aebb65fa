use thiserror::Error;

/// Errors surfaced by the playback engine and its backends.
///
/// Control operations on a session never return these; they are absorbed
/// (a failed stream is marked degraded) or reported to the delegate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("failed to load {source_id}: {reason}")]
    LoadFailed { source_id: String, reason: String },
}

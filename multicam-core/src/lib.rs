//! # multicam-core
//!
//! Synchronized multi-angle playback engine.
//!
//! Loads N camera angles of the same event, keeps them time-aligned, switches
//! between driving all angles and driving one, keeps exactly one angle
//! audible, and supports a timed freeze independent of user pause.
//! Media backends implement the `StreamBackend`/`StreamHandle` traits and
//! plug into the generic `MultiAngleSession`.
//!
//! ## Architecture
//!
//! ```text
//! multicam-core (this crate)
//! ├── traits/      ← StreamHandle, StreamBackend, Scheduler, PlaybackDelegate
//! ├── models/      ← PlaybackError, EngineConfiguration, PlaybackMode, StreamStatus, etc.
//! ├── session/     ← MultiAngleSession, StreamPool, AudioRouter, TimeSynchronizer, FreezeScheduler
//! └── scheduling/  ← ThreadScheduler (wall clock), ManualScheduler (virtual clock)
//! ```

pub mod models;
pub mod scheduling;
pub mod session;
pub mod traits;

#[cfg(test)]
mod test_support;

/// Version of the playback engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export key types at crate root for convenience.
pub use models::config::EngineConfiguration;
pub use models::error::PlaybackError;
pub use models::state::{FreezeState, PlaybackMode, PlaybackSnapshot};
pub use models::stream_models::{StreamMetadata, StreamSource, StreamStatus};
pub use scheduling::manual_scheduler::ManualScheduler;
pub use scheduling::thread_scheduler::ThreadScheduler;
pub use session::engine::MultiAngleSession;
pub use traits::playback_delegate::PlaybackDelegate;
pub use traits::scheduler::{Scheduler, TimerHandle};
pub use traits::stream_handle::{
    SeekCompletion, StreamBackend, StreamEvent, StreamHandle, StreamObserver,
};

//! # multicam-sim
//!
//! Simulated media backend for multicam-core.
//!
//! Provides:
//! - `SimulatedBackend`: `StreamBackend` over a catalog of scripted media
//! - `SimulatedStream`: `StreamHandle` whose clock runs on a `Scheduler`
//! - `MediaCatalog` / `MediaScript`: per-source duration, format, latencies
//!   and load failures
//!
//! With a `ManualScheduler` every load, seek and end-of-media event happens
//! at a deterministic virtual time; with a `ThreadScheduler` the streams run
//! in real time.
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use multicam_core::{EngineConfiguration, MultiAngleSession, ThreadScheduler};
//! use multicam_sim::{MediaCatalog, MediaScript, SimulatedBackend};
//!
//! let scheduler = Arc::new(ThreadScheduler::new());
//! let catalog = MediaCatalog::new().with("north.mp4", MediaScript::new(120.0));
//! let backend = Arc::new(SimulatedBackend::new(scheduler.clone(), catalog));
//! let mut session = MultiAngleSession::new(backend, scheduler, EngineConfiguration::default())?;
//! session.setup(["north.mp4"]);
//! ```

pub mod catalog;
pub mod simulated_backend;
pub mod simulated_stream;

pub use catalog::{CatalogError, MediaCatalog, MediaScript};
pub use simulated_backend::SimulatedBackend;
pub use simulated_stream::{SimulatedStream, StreamProbe};

//! Scripted `StreamBackend`.

use std::sync::Arc;

use parking_lot::Mutex;

use multicam_core::models::error::PlaybackError;
use multicam_core::models::stream_models::StreamSource;
use multicam_core::traits::scheduler::Scheduler;
use multicam_core::traits::stream_handle::{StreamBackend, StreamHandle, StreamObserver};

use crate::catalog::MediaCatalog;
use crate::simulated_stream::{SharedStream, SimulatedStream, StreamProbe};

/// Backend that opens `SimulatedStream`s for the sources in its catalog.
///
/// Streams run on the given scheduler's clock. Every opened stream stays
/// inspectable through `probe`/`probes`, released or not.
pub struct SimulatedBackend {
    scheduler: Arc<dyn Scheduler>,
    catalog: MediaCatalog,
    opened: Mutex<Vec<SharedStream>>,
}

impl SimulatedBackend {
    pub fn new(scheduler: Arc<dyn Scheduler>, catalog: MediaCatalog) -> Self {
        Self {
            scheduler,
            catalog,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn catalog(&self) -> &MediaCatalog {
        &self.catalog
    }

    /// Number of streams opened so far.
    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// State of every opened stream, in open order.
    pub fn probes(&self) -> Vec<StreamProbe> {
        let now = self.scheduler.now();
        self.opened
            .lock()
            .iter()
            .map(|stream| stream.state.lock().probe(now))
            .collect()
    }

    /// State of the most recently opened stream for `location`.
    pub fn probe(&self, location: &str) -> Option<StreamProbe> {
        self.probes()
            .into_iter()
            .rev()
            .find(|probe| probe.location == location)
    }
}

impl StreamBackend for SimulatedBackend {
    fn open(
        &self,
        source: &StreamSource,
        observer: StreamObserver,
    ) -> Result<Box<dyn StreamHandle>, PlaybackError> {
        let script = self
            .catalog
            .get(source.location())
            .cloned()
            .ok_or_else(|| PlaybackError::SourceUnavailable(source.location().to_string()))?;

        log::debug!(
            "Opening simulated stream {} ({:.1}s)",
            source.location(),
            script.duration_secs
        );
        let stream = SimulatedStream::open(
            source.location().to_string(),
            script,
            Arc::clone(&self.scheduler),
            observer,
        );
        self.opened.lock().push(stream.shared().clone());
        Ok(Box::new(stream))
    }

    fn probe_duration(&self, source: &StreamSource) -> Option<f64> {
        self.catalog
            .get(source.location())
            .filter(|script| script.failure.is_none())
            .map(|script| script.duration_secs)
    }
}

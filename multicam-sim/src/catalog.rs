//! Scripted media the simulated backend can open.
//!
//! Each source location maps to a `MediaScript` describing the media's
//! duration and format, how long loading and seeking take, and whether the
//! load fails.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use multicam_core::models::stream_models::{StreamMetadata, StreamStatus};

/// Errors from parsing catalog entries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("entry '{0}' is missing '=<duration>'")]
    MissingDuration(String),

    #[error("entry '{entry}' has invalid duration '{value}'")]
    InvalidDuration { entry: String, value: String },

    #[error("entry '{0}' has an empty location")]
    EmptyLocation(String),
}

/// Behavior of one simulated media file.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaScript {
    pub duration_secs: f64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub load_latency: Duration,
    pub seek_latency: Duration,
    /// Spacing of keyframes; a tolerant seek snaps to the nearest one.
    pub keyframe_interval_secs: f64,
    /// When set, loading ends in `StreamStatus::Failed` with this reason.
    pub failure: Option<String>,
}

impl MediaScript {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            frame_rate: 30.0,
            width: 1920,
            height: 1080,
            codec: "h264".into(),
            load_latency: Duration::from_millis(100),
            seek_latency: Duration::from_millis(50),
            keyframe_interval_secs: 1.0,
            failure: None,
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(0.0)
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    pub fn with_seek_latency(mut self, latency: Duration) -> Self {
        self.seek_latency = latency;
        self
    }

    pub fn with_keyframe_interval(mut self, secs: f64) -> Self {
        self.keyframe_interval_secs = secs;
        self
    }

    pub fn metadata(&self) -> StreamMetadata {
        StreamMetadata {
            duration_secs: self.duration_secs,
            frame_rate: self.frame_rate,
            width: self.width,
            height: self.height,
            codec: self.codec.clone(),
        }
    }

    /// Status reported once loading completes.
    pub fn load_outcome(&self) -> StreamStatus {
        match &self.failure {
            Some(reason) => StreamStatus::Failed(reason.clone()),
            None => StreamStatus::Ready(self.metadata()),
        }
    }

    /// Where a seek to `target` lands given the allowed `tolerance`.
    pub fn landing_position(&self, target: f64, tolerance: f64) -> f64 {
        let target = target.clamp(0.0, self.duration_secs.max(0.0));
        if tolerance <= 0.0 || self.keyframe_interval_secs <= 0.0 {
            return target;
        }
        let keyframe = (target / self.keyframe_interval_secs).round() * self.keyframe_interval_secs;
        if (keyframe - target).abs() <= tolerance && keyframe <= self.duration_secs {
            keyframe
        } else {
            target
        }
    }
}

/// Source location → media script.
#[derive(Debug, Clone, Default)]
pub struct MediaCatalog {
    entries: HashMap<String, MediaScript>,
}

impl MediaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, location: impl Into<String>, script: MediaScript) {
        self.entries.insert(location.into(), script);
    }

    pub fn with(mut self, location: impl Into<String>, script: MediaScript) -> Self {
        self.insert(location, script);
        self
    }

    pub fn get(&self, location: &str) -> Option<&MediaScript> {
        self.entries.get(location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `location=<seconds>` or `location=fail` entries.
    pub fn parse_entry(entry: &str) -> Result<(String, MediaScript), CatalogError> {
        let (location, value) = entry
            .split_once('=')
            .ok_or_else(|| CatalogError::MissingDuration(entry.to_string()))?;
        let location = location.trim();
        if location.is_empty() {
            return Err(CatalogError::EmptyLocation(entry.to_string()));
        }

        let value = value.trim();
        if value.eq_ignore_ascii_case("fail") {
            return Ok((location.to_string(), MediaScript::failing("scripted failure")));
        }
        match value.parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs > 0.0 => {
                Ok((location.to_string(), MediaScript::new(secs)))
            }
            _ => Err(CatalogError::InvalidDuration {
                entry: entry.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Build a catalog from entries, keeping their order as the source list.
    pub fn parse_all<'a, I>(entries: I) -> Result<(Self, Vec<String>), CatalogError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut catalog = Self::new();
        let mut order = Vec::new();
        for entry in entries {
            let (location, script) = Self::parse_entry(entry)?;
            order.push(location.clone());
            catalog.insert(location, script);
        }
        Ok((catalog, order))
    }
}

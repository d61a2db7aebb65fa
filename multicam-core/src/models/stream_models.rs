use serde::{Deserialize, Serialize};

/// Location of one camera angle, as handed to `setup`.
///
/// Identity is the location string; two sources are the same source when
/// their locations are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamSource {
    location: String,
}

impl StreamSource {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl From<&str> for StreamSource {
    fn from(location: &str) -> Self {
        Self::new(location)
    }
}

impl From<String> for StreamSource {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

/// Descriptive information reported by a stream once it is ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMetadata {
    pub duration_secs: f64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

impl StreamMetadata {
    /// Metadata carrying only a duration, for backends that know nothing else.
    pub fn with_duration(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            frame_rate: 0.0,
            width: 0,
            height: 0,
            codec: String::new(),
        }
    }
}

/// Last-known load status of a stream.
///
/// ```text
/// loading → ready
///    ↓
///  failed
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStatus {
    Loading,
    Ready(StreamMetadata),
    Failed(String),
}

impl StreamStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Duration if the stream is ready.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Ready(metadata) => Some(metadata.duration_secs),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&StreamMetadata> {
        match self {
            Self::Ready(metadata) => Some(metadata),
            _ => None,
        }
    }
}

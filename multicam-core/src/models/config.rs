use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::state::PlaybackMode;

/// Tuning for a playback session.
///
/// Deserializable with defaults for every missing field, so a host can keep
/// a partial JSON object in its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfiguration {
    /// Period of the current-time sampler in seconds (default: 1/30).
    pub sampling_interval_secs: f64,

    /// Seek tolerance used when every angle is seeked together (default: 0.1).
    pub multi_angle_seek_tolerance_secs: f64,

    /// Seek tolerance used when only the active angle is seeked (default: 0.0).
    pub single_angle_seek_tolerance_secs: f64,

    /// Delay before resuming after re-aligning all angles (default: 0.1).
    pub resume_settle_delay_secs: f64,

    /// Read-ahead budget handed to every new stream (default: 2.0).
    pub preferred_forward_buffer_secs: f64,

    /// Mode a new session starts in (default: multi-angle).
    pub initial_mode: PlaybackMode,

    /// Playback rate a new session starts with (default: 1.0).
    pub default_rate: f32,
}

impl EngineConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sampling_interval_secs.is_finite() && self.sampling_interval_secs > 0.0) {
            return Err(format!(
                "sampling interval must be positive: {}",
                self.sampling_interval_secs
            ));
        }
        if !(self.multi_angle_seek_tolerance_secs >= 0.0) {
            return Err("multi-angle seek tolerance must not be negative".into());
        }
        if !(self.single_angle_seek_tolerance_secs >= 0.0) {
            return Err("single-angle seek tolerance must not be negative".into());
        }
        if self.single_angle_seek_tolerance_secs > self.multi_angle_seek_tolerance_secs {
            return Err("single-angle seek tolerance must not exceed the multi-angle one".into());
        }
        if !(self.resume_settle_delay_secs.is_finite() && self.resume_settle_delay_secs >= 0.0) {
            return Err("resume settle delay must not be negative".into());
        }
        if !(self.preferred_forward_buffer_secs.is_finite()
            && self.preferred_forward_buffer_secs > 0.0)
        {
            return Err("forward buffer budget must be positive".into());
        }
        if !(self.default_rate.is_finite() && self.default_rate > 0.0) {
            return Err(format!("unsupported playback rate: {}", self.default_rate));
        }
        Ok(())
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs_f64(self.sampling_interval_secs)
    }

    pub fn resume_settle_delay(&self) -> Duration {
        Duration::from_secs_f64(self.resume_settle_delay_secs)
    }

    pub fn seek_tolerance(&self, mode: PlaybackMode) -> f64 {
        match mode {
            PlaybackMode::MultiAngle => self.multi_angle_seek_tolerance_secs,
            PlaybackMode::SingleAngle => self.single_angle_seek_tolerance_secs,
        }
    }
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            sampling_interval_secs: 1.0 / 30.0,
            multi_angle_seek_tolerance_secs: 0.1,
            single_angle_seek_tolerance_secs: 0.0,
            resume_settle_delay_secs: 0.1,
            preferred_forward_buffer_secs: 2.0,
            initial_mode: PlaybackMode::MultiAngle,
            default_rate: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sampling_interval() {
        let config = EngineConfiguration {
            sampling_interval_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_single_tolerance_looser_than_multi() {
        let config = EngineConfiguration {
            multi_angle_seek_tolerance_secs: 0.05,
            single_angle_seek_tolerance_secs: 0.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_rate() {
        let config = EngineConfiguration {
            default_rate: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfiguration =
            serde_json::from_str(r#"{"initial_mode":"single_angle","default_rate":2.0}"#).unwrap();

        assert_eq!(config.initial_mode, PlaybackMode::SingleAngle);
        assert_eq!(config.default_rate, 2.0);
        assert_eq!(config.preferred_forward_buffer_secs, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tolerance_follows_mode() {
        let config = EngineConfiguration::default();
        assert_eq!(config.seek_tolerance(PlaybackMode::MultiAngle), 0.1);
        assert_eq!(config.seek_tolerance(PlaybackMode::SingleAngle), 0.0);
    }
}

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{preset::BeatRange, BinauralError, PresetId, Result};

pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 60;
pub const DURATION_STEP_MINUTES: u32 = 5;
pub const BEAT_STEP_HZ: f32 = 0.5;
pub const VOLUME_STEP: f32 = 0.1;
pub const DEFAULT_VOLUME: f32 = 0.7;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub session: SessionDefaults,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(BinauralError::Config("sample_rate must be positive".into()));
        }
        if self.audio.block_size == 0 {
            return Err(BinauralError::Config("block_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.session.volume) {
            return Err(BinauralError::Config(format!(
                "volume {} is outside [0, 1]",
                self.session.volume
            )));
        }
        Ok(())
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
        }
    }
}

/// Startup values for the session controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub preset: PresetId,
    pub volume: f32,
    pub duration_minutes: u32,
    pub range_policy: RangePolicy,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            preset: PresetId::default(),
            volume: DEFAULT_VOLUME,
            duration_minutes: SessionConfig::default().duration_minutes,
            range_policy: RangePolicy::default(),
        }
    }
}

/// Tunable tone parameters for the next session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub carrier_hz: f32,
    pub beat_hz: f32,
    pub duration_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            carrier_hz: 220.0,
            beat_hz: 10.0,
            duration_minutes: 20,
        }
    }
}

impl SessionConfig {
    /// Frequency of the right channel tone.
    pub fn right_hz(&self) -> f32 {
        self.carrier_hz + self.beat_hz
    }

    /// Session length in seconds, saturating for durations no countdown
    /// could ever reach.
    pub fn duration_seconds(&self) -> u32 {
        self.duration_minutes.saturating_mul(60)
    }
}

/// What configuration updates do with values outside their slider bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// Store the value as given.
    #[default]
    Accept,
    /// Pull the value back into bounds.
    Clamp,
    /// Refuse the update with [`BinauralError::OutOfRange`].
    Reject,
}

impl RangePolicy {
    pub fn beat(self, hz: f32, range: BeatRange) -> Result<f32> {
        match self {
            RangePolicy::Accept => Ok(hz),
            RangePolicy::Clamp => Ok(range.clamp(snap(hz, BEAT_STEP_HZ))),
            RangePolicy::Reject if range.contains(hz) => Ok(hz),
            RangePolicy::Reject => Err(BinauralError::OutOfRange {
                parameter: "beat frequency",
                value: hz,
                min: range.min,
                max: range.max,
            }),
        }
    }

    pub fn carrier(self, hz: f32) -> Result<f32> {
        match self {
            RangePolicy::Accept => Ok(hz),
            RangePolicy::Clamp | RangePolicy::Reject if hz.is_finite() && hz > 0.0 => Ok(hz),
            RangePolicy::Clamp | RangePolicy::Reject => Err(BinauralError::OutOfRange {
                parameter: "carrier frequency",
                value: hz,
                min: 0.0,
                max: f32::INFINITY,
            }),
        }
    }

    pub fn duration(self, minutes: u32) -> Result<u32> {
        let in_bounds = (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes);
        match self {
            RangePolicy::Accept => Ok(minutes),
            RangePolicy::Clamp => {
                let clamped = minutes.clamp(MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
                let steps = (clamped + DURATION_STEP_MINUTES / 2) / DURATION_STEP_MINUTES;
                Ok((steps * DURATION_STEP_MINUTES).min(MAX_DURATION_MINUTES))
            }
            RangePolicy::Reject if in_bounds => Ok(minutes),
            RangePolicy::Reject => Err(BinauralError::OutOfRange {
                parameter: "duration",
                value: minutes as f32,
                min: MIN_DURATION_MINUTES as f32,
                max: MAX_DURATION_MINUTES as f32,
            }),
        }
    }
}

/// Rounds `value` to the nearest multiple of `step`.
pub fn snap(value: f32, step: f32) -> f32 {
    (value / step).round() * step
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RangePolicy::Accept => "accept",
            RangePolicy::Clamp => "clamp",
            RangePolicy::Reject => "reject",
        })
    }
}

impl FromStr for RangePolicy {
    type Err = BinauralError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(RangePolicy::Accept),
            "clamp" => Ok(RangePolicy::Clamp),
            "reject" => Ok(RangePolicy::Reject),
            other => Err(BinauralError::Config(format!("unknown range policy `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config_files() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "session": { "preset": "sleep", "range_policy": "clamp" } }"#)
                .unwrap();

        assert_eq!(config.session.preset, PresetId::Sleep);
        assert_eq!(config.session.range_policy, RangePolicy::Clamp);
        assert_eq!(config.session.volume, DEFAULT_VOLUME);
        assert_eq!(config.audio.sample_rate, 48_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_volume() {
        let mut config = AppConfig::default();
        config.session.volume = 1.5;
        assert!(matches!(config.validate(), Err(BinauralError::Config(_))));
    }

    #[test]
    fn accept_policy_stores_anything() {
        let range = BeatRange::new(8.0, 12.0);
        assert_eq!(RangePolicy::Accept.beat(40.0, range).unwrap(), 40.0);
        assert_eq!(RangePolicy::Accept.duration(90).unwrap(), 90);
        assert_eq!(RangePolicy::Accept.carrier(-3.0).unwrap(), -3.0);
    }

    #[test]
    fn clamp_policy_snaps_duration_to_step() {
        assert_eq!(RangePolicy::Clamp.duration(1).unwrap(), 5);
        assert_eq!(RangePolicy::Clamp.duration(23).unwrap(), 25);
        assert_eq!(RangePolicy::Clamp.duration(22).unwrap(), 20);
        assert_eq!(RangePolicy::Clamp.duration(600).unwrap(), 60);
        assert_eq!(
            RangePolicy::Clamp.beat(3.0, BeatRange::new(8.0, 12.0)).unwrap(),
            8.0
        );
    }

    #[test]
    fn clamp_policy_snaps_beat_to_slider_step() {
        let range = BeatRange::new(8.0, 12.0);
        assert_eq!(RangePolicy::Clamp.beat(9.3, range).unwrap(), 9.5);
        assert_eq!(RangePolicy::Clamp.beat(11.9, range).unwrap(), 12.0);
        assert!((snap(0.72, VOLUME_STEP) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn huge_durations_saturate_instead_of_overflowing() {
        let config = SessionConfig {
            duration_minutes: 100_000_000,
            ..Default::default()
        };
        assert_eq!(config.duration_seconds(), u32::MAX);
    }

    #[test]
    fn reject_policy_reports_bounds() {
        let err = RangePolicy::Reject
            .beat(13.0, BeatRange::new(8.0, 12.0))
            .unwrap_err();
        assert!(matches!(err, BinauralError::OutOfRange { max, .. } if max == 12.0));
        assert!(RangePolicy::Reject.duration(65).is_err());
        assert!(RangePolicy::Reject.carrier(0.0).is_err());
        assert_eq!(RangePolicy::Reject.carrier(180.0).unwrap(), 180.0);
    }

    #[test]
    fn right_channel_adds_beat_to_carrier() {
        let config = SessionConfig::default();
        assert_eq!(config.right_hz(), 230.0);
        assert_eq!(config.duration_seconds(), 1200);
    }
}

//! A run of beats at one tempo

use crate::{Result, TempoError};
use serde::{Deserialize, Serialize};

/// Lowest BPM the ladder editor accepts
pub const MIN_BPM: f64 = 10.0;
/// Highest BPM the ladder editor accepts
pub const MAX_BPM: f64 = 240.0;
/// Fewest beats per step the ladder editor accepts
pub const MIN_BEATS: u32 = 1;
/// Most beats per step the ladder editor accepts
pub const MAX_BEATS: u32 = 64;
/// Beat count for a freshly added step
pub const DEFAULT_BEATS: u32 = 4;

/// A tempo step: `beats` clicks at `bpm` beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoStep {
    pub bpm: f64,
    pub beats: u32,
}

impl TempoStep {
    pub fn new(bpm: f64, beats: u32) -> Self {
        TempoStep { bpm, beats }
    }

    /// Build a step from user-entered values, clamped to the editor limits
    pub fn clamped(bpm: f64, beats: u32) -> Self {
        let bpm = if bpm.is_finite() {
            bpm.clamp(MIN_BPM, MAX_BPM)
        } else {
            MIN_BPM
        };
        TempoStep {
            bpm,
            beats: beats.clamp(MIN_BEATS, MAX_BEATS),
        }
    }

    /// Check the step can be played.
    ///
    /// Playback only needs a finite positive BPM and at least one beat; the
    /// editor limits are not enforced here.
    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 || self.beats == 0 {
            return Err(TempoError::InvalidStep {
                bpm: self.bpm,
                beats: self.beats,
            });
        }
        Ok(())
    }

    /// Spacing between two clicks of this step, in seconds
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Nominal length of the step: beats × spacing
    pub fn duration(&self) -> f64 {
        self.beats as f64 * self.seconds_per_beat()
    }
}

impl std::fmt::Display for TempoStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} BPM x {}", self.bpm, self.beats)
    }
}

impl std::str::FromStr for TempoStep {
    type Err = String;

    /// Parse `"BPM:BEATS"`, e.g. `"120:8"`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (bpm, beats) = s
            .split_once(':')
            .ok_or_else(|| format!("expected BPM:BEATS, got '{}'", s))?;
        let bpm = bpm
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("bad BPM '{}': {}", bpm, e))?;
        let beats = beats
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("bad beat count '{}': {}", beats, e))?;
        Ok(TempoStep::new(bpm, beats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate() {
        assert!(TempoStep::new(120.0, 4).validate().is_ok());
        assert!(TempoStep::new(0.0, 4).validate().is_err());
        assert!(TempoStep::new(-60.0, 4).validate().is_err());
        assert!(TempoStep::new(120.0, 0).validate().is_err());
        assert!(TempoStep::new(f64::NAN, 4).validate().is_err());
        assert!(TempoStep::new(f64::INFINITY, 4).validate().is_err());
    }

    #[test]
    fn test_clamped_to_editor_limits() {
        assert_eq!(TempoStep::clamped(500.0, 100), TempoStep::new(MAX_BPM, MAX_BEATS));
        assert_eq!(TempoStep::clamped(1.0, 0), TempoStep::new(MIN_BPM, MIN_BEATS));
        assert_eq!(TempoStep::clamped(f64::NAN, 8), TempoStep::new(MIN_BPM, 8));
        assert_eq!(TempoStep::clamped(90.0, 12), TempoStep::new(90.0, 12));
    }

    #[test]
    fn test_seconds_per_beat() {
        assert_eq!(TempoStep::new(120.0, 2).seconds_per_beat(), 0.5);
        assert_eq!(TempoStep::new(60.0, 10).duration(), 10.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("120:8".parse::<TempoStep>().unwrap(), TempoStep::new(120.0, 8));
        assert_eq!(" 72.5 : 3 ".parse::<TempoStep>().unwrap(), TempoStep::new(72.5, 3));
        assert!("120".parse::<TempoStep>().is_err());
        assert!("fast:8".parse::<TempoStep>().is_err());
        assert!("120:-1".parse::<TempoStep>().is_err());
    }

    proptest! {
        #[test]
        fn clamped_steps_are_always_playable(bpm in -1000.0f64..1000.0, beats in 0u32..1000) {
            let step = TempoStep::clamped(bpm, beats);
            prop_assert!(step.validate().is_ok());
            prop_assert!(step.bpm >= MIN_BPM && step.bpm <= MAX_BPM);
            prop_assert!(step.beats >= MIN_BEATS && step.beats <= MAX_BEATS);
        }
    }
}

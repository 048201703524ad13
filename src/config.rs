//! Turning command-line options and a settings file into [`Settings`]

use crate::cli::LadderArgs;
use anyhow::{Context, Result};
use sleeptempo_audio::{Ladder, Settings, SoundId, TempoStep};
use std::fs;
use std::path::Path;

/// Read a settings JSON file
pub fn load_settings(path: &Path) -> Result<Settings> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    Settings::from_json(&json).with_context(|| format!("Invalid settings file {}", path.display()))
}

impl LadderArgs {
    /// Settings file (or defaults) with command-line overrides applied
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.settings {
            Some(path) => load_settings(path)?,
            None => Settings::default(),
        };

        if let Some(sound) = &self.sound {
            let id: SoundId = sound.parse().with_context(|| {
                let known: Vec<&str> = SoundId::ALL.iter().map(|id| id.key()).collect();
                format!("Unknown sound '{}' (choose from {})", sound, known.join(", "))
            })?;
            settings.sound = id.key().to_string();
        }

        if self.no_voice {
            settings.voice_count_enabled = false;
        }

        if !self.steps.is_empty() {
            let steps = self.steps.iter().map(|step| clamp_step(*step)).collect();
            settings.ladder = Ladder::new(steps)?;
        }

        Ok(settings)
    }
}

/// Hold a user-entered step to the editor limits
fn clamp_step(step: TempoStep) -> TempoStep {
    let clamped = TempoStep::clamped(step.bpm, step.beats);
    if clamped != step {
        tracing::warn!("Step {} adjusted to {}", step, clamped);
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleeptempo_core::{MAX_BEATS, MAX_BPM};

    fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("sleeptempo-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = LadderArgs::default().resolve().unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_overrides() {
        let args = LadderArgs {
            sound: Some("woodblock".to_string()),
            no_voice: true,
            steps: vec![TempoStep::new(300.0, 100), TempoStep::new(60.0, 4)],
            ..LadderArgs::default()
        };
        let settings = args.resolve().unwrap();
        assert_eq!(settings.sound, "WOODBLOCK");
        assert!(!settings.voice_count_enabled);
        assert_eq!(
            settings.ladder.steps(),
            &[TempoStep::new(MAX_BPM, MAX_BEATS), TempoStep::new(60.0, 4)]
        );
    }

    #[test]
    fn test_unknown_sound() {
        let args = LadderArgs {
            sound: Some("COWBELL".to_string()),
            ..LadderArgs::default()
        };
        let err = args.resolve().unwrap_err();
        assert!(err.to_string().contains("COWBELL"));
    }

    #[test]
    fn test_settings_file() {
        let path = temp_file(
            "settings.json",
            r#"{ "sound": "SNAP", "ladder": [{ "bpm": 90, "beats": 8 }] }"#,
        );
        let args = LadderArgs {
            settings: Some(path.clone()),
            ..LadderArgs::default()
        };
        let settings = args.resolve().unwrap();
        assert_eq!(settings.sound, "SNAP");
        assert!(settings.voice_count_enabled);
        assert_eq!(settings.ladder.steps(), &[TempoStep::new(90.0, 8)]);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_bad_settings_file() {
        let path = temp_file("empty-ladder.json", r#"{ "ladder": [] }"#);
        assert!(load_settings(&path).is_err());
        fs::remove_file(&path).unwrap();

        assert!(load_settings(Path::new("/nonexistent/sleeptempo.json")).is_err());
    }
}

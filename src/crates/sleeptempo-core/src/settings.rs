//! Values supplied by the settings provider

use crate::{Ladder, Result, SoundId};
use serde::{Deserialize, Serialize};

/// Full settings snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Settings key of the selected click sound (see [`SoundId::key`]).
    ///
    /// Kept as a string so a stale or unknown key survives a round trip;
    /// the engine reports it as unavailable instead of failing to parse.
    pub sound: String,
    pub voice_count_enabled: bool,
    pub ladder: Ladder,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sound: SoundId::Default.key().to_string(),
            voice_count_enabled: true,
            ladder: Ladder::default(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Merge a partial update into this snapshot
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(sound) = &update.sound {
            self.sound = sound.clone();
        }
        if let Some(enabled) = update.voice_count_enabled {
            self.voice_count_enabled = enabled;
        }
        if let Some(ladder) = &update.ladder {
            self.ladder = ladder.clone();
        }
    }
}

/// Partial settings change pushed at any time, even mid-playback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_count_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ladder: Option<Ladder>,
}

impl SettingsUpdate {
    pub fn sound(id: impl Into<String>) -> Self {
        SettingsUpdate {
            sound: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn voice_count(enabled: bool) -> Self {
        SettingsUpdate {
            voice_count_enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn ladder(ladder: Ladder) -> Self {
        SettingsUpdate {
            ladder: Some(ladder),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sound.is_none() && self.voice_count_enabled.is_none() && self.ladder.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TempoStep;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.sound, "DEFAULT");
        assert!(settings.voice_count_enabled);
        assert_eq!(settings.ladder, Ladder::default());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings {
            sound: "KALIMBA".to_string(),
            voice_count_enabled: false,
            ladder: Ladder::new(vec![TempoStep::new(80.0, 16)]).unwrap(),
        };
        let json = settings.to_json().unwrap();
        assert!(json.contains("voiceCountEnabled"));
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings = Settings::from_json(r#"{ "sound": "SNAP" }"#).unwrap();
        assert_eq!(settings.sound, "SNAP");
        assert!(settings.voice_count_enabled);
        assert_eq!(settings.ladder, Ladder::default());
    }

    #[test]
    fn test_invalid_ladder_rejected() {
        assert!(Settings::from_json(r#"{ "ladder": [] }"#).is_err());
        assert!(Settings::from_json(r#"{ "ladder": [{ "bpm": -5, "beats": 4 }] }"#).is_err());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut settings = Settings::default();
        settings.apply(&SettingsUpdate::voice_count(false));
        assert!(!settings.voice_count_enabled);
        assert_eq!(settings.sound, "DEFAULT");

        settings.apply(&SettingsUpdate::sound("TONGUE"));
        assert_eq!(settings.sound, "TONGUE");
        assert!(!settings.voice_count_enabled);

        assert!(SettingsUpdate::default().is_empty());
        assert!(!SettingsUpdate::sound("X").is_empty());
    }
}

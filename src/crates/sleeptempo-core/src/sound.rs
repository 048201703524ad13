//! Catalog of selectable click timbres

use crate::TempoError;
use serde::{Deserialize, Serialize};

/// Identifier of a selectable click sound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundId {
    #[default]
    Default,
    Rimshot,
    Woodblock,
    Kalimba,
    Airpod,
    Snap,
    Heartbeat,
    Tongue,
}

/// Which synthesis routine renders a synthesized sound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SynthKind {
    Triangle,
    Rimshot,
    Woodblock,
    Kalimba,
}

/// Where a sound's PCM comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSource {
    /// Rendered in-process
    Synth(SynthKind),
    /// Decoded from an asset; the value is the file stem under `sounds/`
    Sample(&'static str),
}

impl SoundId {
    pub const ALL: [SoundId; 8] = [
        SoundId::Default,
        SoundId::Rimshot,
        SoundId::Woodblock,
        SoundId::Kalimba,
        SoundId::Airpod,
        SoundId::Snap,
        SoundId::Heartbeat,
        SoundId::Tongue,
    ];

    /// Settings key, e.g. `"RIMSHOT"`
    pub fn key(&self) -> &'static str {
        match self {
            SoundId::Default => "DEFAULT",
            SoundId::Rimshot => "RIMSHOT",
            SoundId::Woodblock => "WOODBLOCK",
            SoundId::Kalimba => "KALIMBA",
            SoundId::Airpod => "AIRPOD",
            SoundId::Snap => "SNAP",
            SoundId::Heartbeat => "HEARTBEAT",
            SoundId::Tongue => "TONGUE",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            SoundId::Default => "Default (Triangle)",
            SoundId::Rimshot => "Soft Rimshot",
            SoundId::Woodblock => "Muted Woodblock",
            SoundId::Kalimba => "Kalimba Pluck",
            SoundId::Airpod => "Airpod Case Close",
            SoundId::Snap => "Finger Snap",
            SoundId::Heartbeat => "Heart Beat",
            SoundId::Tongue => "Tongue Click",
        }
    }

    pub fn source(&self) -> SoundSource {
        match self {
            SoundId::Default => SoundSource::Synth(SynthKind::Triangle),
            SoundId::Rimshot => SoundSource::Synth(SynthKind::Rimshot),
            SoundId::Woodblock => SoundSource::Synth(SynthKind::Woodblock),
            SoundId::Kalimba => SoundSource::Synth(SynthKind::Kalimba),
            SoundId::Airpod => SoundSource::Sample("airpod"),
            SoundId::Snap => SoundSource::Sample("snap"),
            SoundId::Heartbeat => SoundSource::Sample("heartbeat"),
            SoundId::Tongue => SoundSource::Sample("tongue"),
        }
    }
}

impl std::fmt::Display for SoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for SoundId {
    type Err = TempoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundId::ALL
            .iter()
            .find(|id| id.key().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| TempoError::UnknownSound(s.to_string()))
    }
}

//! Click scheduling engine for SleepTempo
//!
//! This crate turns a ladder of tempo steps into sample-accurate click
//! triggers:
//! - Loads or synthesizes every click timbre, with layered fallbacks
//! - Schedules clicks ahead of the audio clock by a fixed look-ahead window
//! - Chains steps into a ladder and keeps an absolute beat count
//! - Overlays a spoken count on every tenth absolute beat

pub mod assets;
pub mod bank;
pub mod buffer;
pub mod clock;
pub mod decode;
pub mod device;
pub mod mixer;
pub mod player;
pub mod scheduler;
pub mod sequencer;
pub mod synth;
pub mod voice;

pub use assets::{AssetSource, DirAssets, MemoryAssets};
pub use bank::{LoadReport, LoadStrategy, LoadTier, SoundBank, VoiceCues};
pub use buffer::SoundBuffer;
pub use clock::{AudioClock, OfflineClock, TriggerRecord, VoiceId};
pub use device::DeviceClock;
pub use mixer::Mixer;
pub use player::{Player, PlayerConfig};
pub use scheduler::{EngineConfig, PlaybackState, Scheduler};
pub use sequencer::Sequencer;
pub use voice::Voice;

/// Re-export common types from sleeptempo-core
pub use sleeptempo_core::{
    CueRegion, Ladder, Settings, SettingsUpdate, SoundId, TempoError, TempoStep, VoiceCountOffsets,
};

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Audio engine not ready: no click buffer loaded")]
    EngineNotReady,

    #[error("Already playing; stop first")]
    AlreadyPlaying,

    #[error("Sound unavailable: {0}")]
    SoundUnavailable(String),

    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Failed to decode audio: {0}")]
    DecodeError(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Failed to load asset: {0}")]
    AssetError(String),

    #[error("Synthesis failed: {0}")]
    SynthError(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Tempo(#[from] TempoError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl AudioError {
    /// True for errors that leave the session unable to produce any audio
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AudioError::EngineUnavailable(_) | AudioError::DeviceError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AudioError::EngineUnavailable("no synth".into()).is_fatal());
        assert!(AudioError::DeviceError("no device".into()).is_fatal());
        assert!(!AudioError::SoundUnavailable("BANJO".into()).is_fatal());
        assert!(!AudioError::EngineNotReady.is_fatal());
    }

    #[test]
    fn test_tempo_errors_convert() {
        let err: AudioError = TempoError::EmptyLadder.into();
        assert!(matches!(err, AudioError::Tempo(TempoError::EmptyLadder)));
        assert_eq!(err.to_string(), "Ladder has no steps");
    }
}

//! Core types for the SleepTempo metronome
//!
//! This crate holds the plain data model shared by the audio engine and its
//! hosts. Nothing here touches audio devices or the clock.
//!
//! # Examples
//!
//! ```
//! use sleeptempo_core::{Ladder, TempoStep};
//!
//! let ladder = Ladder::new(vec![
//!     TempoStep::new(120.0, 5),
//!     TempoStep::new(60.0, 10),
//! ]).unwrap();
//!
//! assert_eq!(ladder.total_beats(), 15);
//! ```
//!
//! # Main Components
//!
//! - **TempoStep** / **Ladder**: what gets played, in order
//! - **SoundId**: the catalog of selectable click timbres
//! - **Settings**: the values a settings provider hands to the engine
//! - **VoiceCountOffsets**: where each spoken count lives in the cue buffer

pub mod cues;
pub mod error;
pub mod ladder;
pub mod settings;
pub mod sound;
pub mod step;

pub use cues::{is_cue_beat, CueRegion, VoiceCountOffsets, VOICE_CUE_INTERVAL, VOICE_CUE_LIMIT};
pub use error::{Result, TempoError};
pub use ladder::Ladder;
pub use settings::{Settings, SettingsUpdate};
pub use sound::{SoundId, SoundSource, SynthKind};
pub use step::{TempoStep, DEFAULT_BEATS, MAX_BEATS, MAX_BPM, MIN_BEATS, MIN_BPM};

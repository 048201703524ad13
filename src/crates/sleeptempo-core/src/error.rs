//! Error types for the data model

use thiserror::Error;

/// Validation and parsing failures for ladders, steps and settings
#[derive(Debug, Error)]
pub enum TempoError {
    #[error("Invalid tempo step: bpm={bpm}, beats={beats} (both must be > 0)")]
    InvalidStep { bpm: f64, beats: u32 },

    #[error("Ladder has no steps")]
    EmptyLadder,

    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TempoError>;

//! Offset table for the concatenated voice-count buffer

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Spoken counts are cataloged every this many absolute beats
pub const VOICE_CUE_INTERVAL: u64 = 10;
/// Highest absolute beat that can carry a spoken count
pub const VOICE_CUE_LIMIT: u64 = 100;

/// Where one spoken number sits inside the cue buffer, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CueRegion {
    pub start: f64,
    pub duration: f64,
}

impl CueRegion {
    pub fn new(start: f64, duration: f64) -> Self {
        CueRegion { start, duration }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Mapping from beat-number string (`"10"`, `"20"`, ...) to its cue region
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceCountOffsets {
    entries: BTreeMap<String, CueRegion>,
}

impl VoiceCountOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert(&mut self, beat: u64, region: CueRegion) {
        self.entries.insert(beat.to_string(), region);
    }

    /// Region for an absolute beat number, if cataloged
    pub fn for_beat(&self, beat: u64) -> Option<CueRegion> {
        self.entries.get(&beat.to_string()).copied()
    }

    /// Largest beat number with a usable entry, never above [`VOICE_CUE_LIMIT`]
    pub fn max_cataloged_beat(&self) -> Option<u64> {
        self.entries
            .keys()
            .filter_map(|k| k.parse::<u64>().ok())
            .filter(|&b| is_cue_beat(b))
            .max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// True for positive multiples of ten up to the cue limit
pub fn is_cue_beat(beat: u64) -> bool {
    beat > 0 && beat % VOICE_CUE_INTERVAL == 0 && beat <= VOICE_CUE_LIMIT
}

//! Decoded PCM buffers

use crate::{AudioError, CueRegion, Result};
use std::sync::Arc;

/// A fixed-duration mono PCM buffer
#[derive(Debug, Clone)]
pub struct SoundBuffer {
    /// Name used in logs and trigger records (e.g. "RIMSHOT", "voice")
    pub name: String,
    /// Audio data (mono f32, normalized to [-1.0, 1.0])
    pub data: Arc<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl SoundBuffer {
    /// Wrap rendered samples; empty data or a zero rate is rejected
    pub fn new(name: impl Into<String>, data: Vec<f32>, sample_rate: u32) -> Result<Self> {
        let name = name.into();
        if sample_rate == 0 {
            return Err(AudioError::Other(format!("{}: sample rate is zero", name)));
        }
        if data.is_empty() {
            return Err(AudioError::Other(format!("{}: buffer is empty", name)));
        }
        Ok(SoundBuffer {
            name,
            data: Arc::new(data),
            sample_rate,
        })
    }

    /// Get the duration of this buffer in seconds
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    pub fn frames(&self) -> usize {
        self.data.len()
    }

    /// Frame range covered by `region`, clipped to the buffer
    pub fn frame_range(&self, region: Option<CueRegion>) -> std::ops::Range<usize> {
        let Some(region) = region else {
            return 0..self.frames();
        };
        let rate = self.sample_rate as f64;
        let start = ((region.start.max(0.0) * rate).round() as usize).min(self.frames());
        let end = ((region.end().max(0.0) * rate).round() as usize).clamp(start, self.frames());
        start..end
    }

    /// Playback length of `region` in seconds
    pub fn region_duration(&self, region: Option<CueRegion>) -> f64 {
        self.frame_range(region).len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_degenerate_buffers() {
        assert!(SoundBuffer::new("empty", vec![], 44100).is_err());
        assert!(SoundBuffer::new("norate", vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn test_duration_and_regions() {
        let buffer = SoundBuffer::new("test", vec![0.5; 1000], 1000).unwrap();
        assert_eq!(buffer.duration(), 1.0);
        assert_eq!(buffer.frame_range(None), 0..1000);
        assert_eq!(buffer.frame_range(Some(CueRegion::new(0.25, 0.5))), 250..750);
        assert_eq!(buffer.region_duration(Some(CueRegion::new(0.25, 0.5))), 0.5);
    }

    #[test]
    fn test_region_clipped_to_buffer() {
        let buffer = SoundBuffer::new("test", vec![0.5; 1000], 1000).unwrap();
        assert_eq!(buffer.frame_range(Some(CueRegion::new(0.9, 0.5))), 900..1000);
        assert_eq!(buffer.frame_range(Some(CueRegion::new(2.0, 0.5))), 1000..1000);
        assert_eq!(buffer.frame_range(Some(CueRegion::new(-1.0, 1.5))), 0..500);
    }
}

//! Voice represents a single scheduled buffer playback

use crate::{CueRegion, SoundBuffer, VoiceId};

/// A voice playing one buffer region, starting at an absolute output frame
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    buffer: SoundBuffer,
    /// Current playback position (in buffer frames, fractional)
    position: f64,
    /// Exclusive end of the region being played (in buffer frames)
    end: usize,
    /// Output frame at which playback begins
    start_frame: u64,
    /// Output frame at which playback is cut off
    halt_frame: Option<u64>,
    active: bool,
}

impl Voice {
    /// Create a voice for `region` of `buffer` (the whole buffer when `None`)
    pub fn new(id: VoiceId, buffer: SoundBuffer, region: Option<CueRegion>, start_frame: u64) -> Self {
        let range = buffer.frame_range(region);
        Voice {
            id,
            position: range.start as f64,
            end: range.end,
            active: !range.is_empty(),
            buffer,
            start_frame,
            halt_frame: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn start_frame(&self) -> u64 {
        self.start_frame
    }

    /// Check if this voice still has anything to play
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cut the voice off at `frame`. An earlier halt always wins.
    pub fn halt_at(&mut self, frame: u64) {
        self.halt_frame = Some(self.halt_frame.map_or(frame, |h| h.min(frame)));
    }

    /// Next mono sample, advancing by one output frame
    ///
    /// Returns None once the region is exhausted
    pub fn next_sample(&mut self, output_sample_rate: u32) -> Option<f32> {
        if !self.active {
            return None;
        }
        if self.position >= self.end as f64 {
            self.active = false;
            return None;
        }

        let sample = self.interpolate_sample_at_position(self.position);

        // Advance position (accounting for sample rate differences)
        self.position += self.buffer.sample_rate as f64 / output_sample_rate as f64;

        Some(sample)
    }

    /// Linear interpolation between the two buffer frames around `frame_position`
    ///
    /// Never reads past the end of the region.
    fn interpolate_sample_at_position(&self, frame_position: f64) -> f32 {
        let data = &self.buffer.data;
        let index = frame_position.floor() as usize;
        if index >= self.end || index >= data.len() {
            return 0.0;
        }

        let current = data[index];
        let next_index = index + 1;
        if next_index >= self.end || next_index >= data.len() {
            return current;
        }

        let fraction = (frame_position - frame_position.floor()) as f32;
        current + (data[next_index] - current) * fraction
    }

    /// Mix this voice into an interleaved block whose first frame is the
    /// absolute output frame `block_start`
    ///
    /// Mono output is copied to every channel.
    pub fn fill_buffer(&mut self, buffer: &mut [f32], channels: usize, block_start: u64, output_sample_rate: u32) {
        let channels = channels.max(1);
        for (i, frame) in buffer.chunks_mut(channels).enumerate() {
            let absolute = block_start + i as u64;
            if absolute < self.start_frame {
                continue;
            }
            if self.halt_frame.is_some_and(|h| absolute >= h) {
                self.active = false;
                break;
            }
            match self.next_sample(output_sample_rate) {
                Some(sample) => frame.iter_mut().for_each(|out| *out += sample),
                None => break,
            }
        }
    }
}

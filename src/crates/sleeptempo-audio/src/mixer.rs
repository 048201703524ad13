//! Sums scheduled voices into interleaved output blocks

use crate::{Voice, VoiceId};

/// The set of voices an output stream renders
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    voices: Vec<Voice>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Mixer {
            sample_rate,
            voices: Vec::new(),
        }
    }

    pub fn add(&mut self, voice: Voice) {
        if voice.is_active() {
            self.voices.push(voice);
        }
    }

    /// Cut a voice off at an absolute output frame; unknown ids are ignored
    pub fn halt(&mut self, id: VoiceId, frame: u64) {
        if let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) {
            voice.halt_at(frame);
        }
    }

    /// Voices that have not finished yet
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Render one interleaved block starting at absolute frame `block_start`
    pub fn fill_buffer(&mut self, buffer: &mut [f32], channels: usize, block_start: u64) {
        buffer.fill(0.0);

        let sample_rate = self.sample_rate;
        self.voices.retain_mut(|voice| {
            voice.fill_buffer(buffer, channels, block_start, sample_rate);
            voice.is_active()
        });

        for sample in buffer.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }
    }
}

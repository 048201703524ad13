//! Offline synthesis of the built-in click timbres
//!
//! Every routine renders a short mono buffer at the requested sample rate.
//! Envelopes are exponential ramps from 1.0 to 0.0001, the same curve a
//! `exponentialRampToValueAtTime` automation produces.

use crate::{AudioError, Result, SoundBuffer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sleeptempo_core::SynthKind;
use std::f32::consts::{PI, TAU};

/// Envelope floor reached at the end of a ramp
const RAMP_FLOOR: f32 = 0.0001;
/// Peak level every synthesized buffer is normalized to
const TARGET_PEAK: f32 = 0.8;
/// Noise seed; fixed so rebuilt banks are bit-identical
const NOISE_SEED: u64 = 0x5EED_C11C;

/// Length of the guaranteed fallback click
pub const MINIMAL_CLICK_SECONDS: f32 = 0.005;

/// Render the timbre for `kind`
pub fn synthesize(kind: SynthKind, name: &str, sample_rate: u32) -> Result<SoundBuffer> {
    if sample_rate == 0 {
        return Err(AudioError::SynthError(format!("{}: sample rate is zero", name)));
    }
    let data = match kind {
        SynthKind::Triangle => triangle_click(sample_rate),
        SynthKind::Rimshot => rimshot(sample_rate),
        SynthKind::Woodblock => woodblock(sample_rate),
        SynthKind::Kalimba => kalimba(1046.0, sample_rate),
    };
    finish(name, data, sample_rate)
}

/// A 5 ms square-wave burst: first half +1, second half -1.
///
/// This is the floor of every fallback chain.
pub fn minimal_click(name: &str, sample_rate: u32) -> Result<SoundBuffer> {
    let frames = (sample_rate as f32 * MINIMAL_CLICK_SECONDS) as usize;
    if frames < 2 {
        return Err(AudioError::SynthError(format!(
            "{}: sample rate {} too low for a click",
            name, sample_rate
        )));
    }
    let data = (0..frames)
        .map(|i| if i < frames / 2 { 1.0 } else { -1.0 })
        .collect();
    SoundBuffer::new(name, data, sample_rate).map_err(|e| AudioError::SynthError(e.to_string()))
}

fn finish(name: &str, mut data: Vec<f32>, sample_rate: u32) -> Result<SoundBuffer> {
    let peak = data.iter().fold(0.0f32, |p, s| p.max(s.abs()));
    if data.is_empty() || peak <= f32::EPSILON || !peak.is_finite() {
        return Err(AudioError::SynthError(format!("{}: rendered silence", name)));
    }
    let scale = TARGET_PEAK / peak;
    data.iter_mut().for_each(|s| *s *= scale);
    SoundBuffer::new(name, data, sample_rate).map_err(|e| AudioError::SynthError(e.to_string()))
}

fn frames_for(seconds: f32, sample_rate: u32) -> usize {
    (seconds * sample_rate as f32).round() as usize
}

/// Exponential ramp from 1.0 down to [`RAMP_FLOOR`] over `length` seconds
fn ramp(t: f32, length: f32) -> f32 {
    RAMP_FLOOR.powf((t / length).min(1.0))
}

fn triangle(phase: f32) -> f32 {
    // phase in [0, 1)
    1.0 - 4.0 * (phase - 0.5).abs()
}

fn noise(frames: usize) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    (0..frames).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Short decaying triangle tone
fn triangle_click(sample_rate: u32) -> Vec<f32> {
    let length = 0.03;
    let freq = 1000.0;
    let sr = sample_rate as f32;
    (0..frames_for(length, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            triangle((t * freq).fract()) * ramp(t, length)
        })
        .collect()
}

/// Band-passed noise burst with a short triangle "stick" transient
fn rimshot(sample_rate: u32) -> Vec<f32> {
    let length = 0.06;
    let stick_length = 0.02;
    let stick_freq = 2400.0;
    let sr = sample_rate as f32;
    let frames = frames_for(length, sample_rate);

    let mut band = StateVariable::new(2500.0, 1.0, sr);
    noise(frames)
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            let t = i as f32 / sr;
            let stick = if t < stick_length {
                triangle((t * stick_freq).fract())
            } else {
                0.0
            };
            (band.process(n).bandpass + stick) * ramp(t, length)
        })
        .collect()
}

/// Two sine partials with independent decays
fn woodblock(sample_rate: u32) -> Vec<f32> {
    let partials = [(550.0f32, 0.08f32), (825.0, 0.06)];
    let sr = sample_rate as f32;
    (0..frames_for(0.1, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            partials
                .iter()
                .filter(|(_, decay)| t < *decay)
                .map(|(f, decay)| (TAU * f * t).sin() * ramp(t, *decay))
                .sum::<f32>()
        })
        .collect()
}

/// Plucked tine: looped noise drives a delay line tuned to `pitch_hz`,
/// fed back through a low-pass filter
fn kalimba(pitch_hz: f32, sample_rate: u32) -> Vec<f32> {
    let length = 0.4;
    let feedback = 0.97;
    let sr = sample_rate as f32;
    let delay_len = ((sr / pitch_hz).round() as usize).max(1);

    let excitation = noise(delay_len);
    let mut delay = vec![0.0f32; delay_len];
    let mut lowpass = StateVariable::new(4000.0, 0.2, sr);
    let mut pos = 0;

    (0..frames_for(length, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let filtered = lowpass.process(delay[pos]).lowpass;
            delay[pos] = excitation[i % delay_len] + feedback * filtered;
            pos = (pos + 1) % delay_len;
            filtered * ramp(t, length)
        })
        .collect()
}

struct FilterOutputs {
    lowpass: f32,
    bandpass: f32,
}

/// Trapezoidal state-variable filter
struct StateVariable {
    ic1eq: f32,
    ic2eq: f32,
    g: f32,
    k: f32,
}

impl StateVariable {
    fn new(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let cutoff = cutoff_hz.min(sample_rate * 0.49);
        StateVariable {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: (PI * cutoff / sample_rate).tan(),
            k: 1.0 / q.max(0.01),
        }
    }

    fn process(&mut self, sample: f32) -> FilterOutputs {
        let h = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        FilterOutputs {
            lowpass: v2,
            // unity gain at the centre frequency
            bandpass: self.k * v1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48000;

    #[test]
    fn test_every_kind_renders_normalized_audio() {
        for (kind, seconds) in [
            (SynthKind::Triangle, 0.03),
            (SynthKind::Rimshot, 0.06),
            (SynthKind::Woodblock, 0.1),
            (SynthKind::Kalimba, 0.4),
        ] {
            let buffer = synthesize(kind, "test", SR).unwrap();
            assert!((buffer.duration() - seconds).abs() < 1e-3, "{:?}", kind);
            assert!((buffer.peak() - TARGET_PEAK).abs() < 1e-4, "{:?}", kind);
            assert!(buffer.data.iter().all(|s| s.is_finite()), "{:?}", kind);
        }
    }

    #[test]
    fn test_envelopes_decay() {
        let buffer = synthesize(SynthKind::Woodblock, "wood", SR).unwrap();
        let head: f32 = buffer.data[..480].iter().map(|s| s.abs()).sum();
        let tail: f32 = buffer.data[buffer.frames() - 480..].iter().map(|s| s.abs()).sum();
        assert!(tail < head * 0.01);
    }

    #[test]
    fn test_synthesis_is_reproducible() {
        let a = synthesize(SynthKind::Rimshot, "a", SR).unwrap();
        let b = synthesize(SynthKind::Rimshot, "b", SR).unwrap();
        assert_eq!(a.data, b.data);
    }

    #[test]
    fn test_zero_sample_rate_fails() {
        assert!(matches!(
            synthesize(SynthKind::Kalimba, "k", 0),
            Err(AudioError::SynthError(_))
        ));
    }

    #[test]
    fn test_minimal_click_shape() {
        let click = minimal_click("min", 44100).unwrap();
        assert_eq!(click.frames(), 220);
        assert!(click.data[..110].iter().all(|&s| s == 1.0));
        assert!(click.data[110..].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn test_minimal_click_needs_a_usable_rate() {
        assert!(minimal_click("min", 0).is_err());
        assert!(minimal_click("min", 100).is_err());
    }

    #[test]
    fn test_triangle_wave() {
        assert_eq!(triangle(0.0), -1.0);
        assert_eq!(triangle(0.5), 1.0);
        assert_eq!(triangle(0.25), 0.0);
    }
}

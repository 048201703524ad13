//! Audio clock backed by the default cpal output device
//!
//! The clock is the number of frames the output callback has rendered, so
//! scheduled times line up with what the device actually plays.

use crate::clock::seconds_to_frame;
use crate::{AudioClock, AudioError, CueRegion, Mixer, Result, SoundBuffer, Voice, VoiceId};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Output stream plus the mixer it renders
pub struct DeviceClock {
    /// Output stream; held only to keep it alive and to play it
    stream: Stream,
    sample_rate: u32,
    frames_rendered: Arc<AtomicU64>,
    mixer: Arc<Mutex<Mixer>>,
    playing: AtomicBool,
    next_id: AtomicU64,
}

impl DeviceClock {
    /// Open the default output device. The stream starts suspended.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceError("No output device available".to_string()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceError(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels;

        let frames_rendered = Arc::new(AtomicU64::new(0));
        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate)));

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, &mixer, &frames_rendered),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, &mixer, &frames_rendered),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, &mixer, &frames_rendered),
            other => Err(AudioError::DeviceError(format!(
                "Unsupported sample format: {:?}",
                other
            ))),
        }?;

        // some hosts start streams on creation
        if let Err(e) = stream.pause() {
            tracing::debug!("Could not pause new output stream: {}", e);
        }

        tracing::info!(
            "Opened output device {} ({} Hz, {} channels)",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string()),
            sample_rate,
            channels
        );

        Ok(DeviceClock {
            stream,
            sample_rate,
            frames_rendered,
            mixer,
            playing: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: &Arc<Mutex<Mixer>>,
    frames_rendered: &Arc<AtomicU64>,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mixer = Arc::clone(mixer);
    let frames_rendered = Arc::clone(frames_rendered);
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                let block_start = frames_rendered.load(Ordering::Acquire);
                mixer.lock().fill_buffer(&mut scratch, channels, block_start);
                for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                    *out = T::from_sample(*sample);
                }
                frames_rendered.fetch_add((data.len() / channels.max(1)) as u64, Ordering::Release);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::DeviceError(format!("Failed to build stream: {}", e)))
}

impl AudioClock for DeviceClock {
    fn now(&self) -> f64 {
        self.frames_rendered.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn schedule(&self, buffer: &SoundBuffer, at: f64, region: Option<CueRegion>) -> Result<VoiceId> {
        let id = VoiceId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let voice = Voice::new(id, buffer.clone(), region, seconds_to_frame(at, self.sample_rate));
        self.mixer.lock().add(voice);
        Ok(id)
    }

    fn halt(&self, voice: VoiceId, at: f64) {
        self.mixer
            .lock()
            .halt(voice, seconds_to_frame(at, self.sample_rate));
    }

    fn resume(&self) -> Result<()> {
        if self.playing.load(Ordering::Acquire) {
            return Ok(());
        }
        self.stream
            .play()
            .map_err(|e| AudioError::DeviceError(format!("Failed to play stream: {}", e)))?;
        self.playing.store(true, Ordering::Release);
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        !self.playing.load(Ordering::Acquire)
    }
}

//! Offline rendering of a ladder to a WAV file

use hound::{SampleFormat, WavSpec, WavWriter};
use sleeptempo_audio::{
    AssetSource, AudioClock, AudioError, OfflineClock, Player, PlayerConfig, Settings, SoundBank,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Seconds of audio kept after the last beat so the final click and cue ring out
const TAIL_SECONDS: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hound error: {0}")]
    Hound(#[from] hound::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Rendering failed: {0}")]
    Render(#[from] AudioError),
}

#[derive(Debug, Clone)]
pub struct ExportParams {
    pub output_path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl ExportParams {
    pub fn new(output_path: impl Into<PathBuf>, sample_rate: u32, bit_depth: u16) -> Self {
        ExportParams {
            output_path: output_path.into(),
            sample_rate,
            channels: 2,
            bit_depth,
        }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.channels != 2 {
            return Err(ExportError::InvalidParams(
                "Only stereo (2 channels) is supported".to_string(),
            ));
        }

        if ![16, 24, 32].contains(&self.bit_depth) {
            return Err(ExportError::InvalidParams(format!(
                "Bit depth must be 16, 24, or 32, got {}",
                self.bit_depth
            )));
        }

        if ![44100, 48000, 96000].contains(&self.sample_rate) {
            return Err(ExportError::InvalidParams(format!(
                "Sample rate must be 44100, 48000, or 96000 Hz, got {}",
                self.sample_rate
            )));
        }

        let extension = self.output_path.extension().and_then(|e| e.to_str());
        if !extension.is_some_and(|e| e.eq_ignore_ascii_case("wav")) {
            return Err(ExportError::InvalidParams(format!(
                "Output must be a .wav file, got {}",
                self.output_path.display()
            )));
        }

        Ok(())
    }
}

/// What a render produced
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub seconds: f64,
    pub clicks: usize,
    pub voice_cues: usize,
}

/// Play `settings` against an offline clock and return interleaved stereo PCM
pub async fn render_ladder(
    settings: &Settings,
    assets: &dyn AssetSource,
    sample_rate: u32,
) -> Result<(Vec<f32>, RenderSummary), ExportError> {
    let clock = Arc::new(OfflineClock::new(sample_rate));
    let bank = SoundBank::load(assets, sample_rate).await?;

    let mut player = Player::new(Arc::clone(&clock), settings.clone(), PlayerConfig::default());
    player.attach_bank(Arc::new(bank));
    player.start()?;

    while let Some(due) = player.next_wakeup() {
        clock.set_time(due);
        player.advance()?;
    }

    let seconds = clock.now() + TAIL_SECONDS;
    let triggers = clock.triggers();
    let voice_cues = triggers.iter().filter(|t| t.region.is_some()).count();
    let summary = RenderSummary {
        seconds,
        clicks: triggers.len() - voice_cues,
        voice_cues,
    };

    tracing::info!(
        "Rendered {:.1}s: {} clicks, {} voice cues",
        summary.seconds,
        summary.clicks,
        summary.voice_cues
    );
    Ok((clock.render(seconds, 2), summary))
}

/// Render `settings` and write it to `params.output_path`
pub async fn export_wav(
    settings: &Settings,
    assets: &dyn AssetSource,
    params: &ExportParams,
) -> Result<RenderSummary, ExportError> {
    params.validate()?;
    let (pcm, summary) = render_ladder(settings, assets, params.sample_rate).await?;
    encode_wav(&pcm, params)?;
    tracing::info!("Wrote {}", params.output_path.display());
    Ok(summary)
}

/// Encode interleaved stereo samples to a WAV file
pub fn encode_wav(interleaved: &[f32], params: &ExportParams) -> Result<(), ExportError> {
    let spec = WavSpec {
        channels: params.channels,
        sample_rate: params.sample_rate,
        bits_per_sample: params.bit_depth,
        sample_format: if params.bit_depth == 32 {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(&params.output_path, spec)?;

    match params.bit_depth {
        16 => {
            for sample in interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)?;
            }
        }
        24 => {
            for sample in interleaved {
                writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0) as i32)?;
            }
        }
        32 => {
            for sample in interleaved {
                writer.write_sample(*sample)?;
            }
        }
        other => {
            return Err(ExportError::InvalidParams(format!(
                "Bit depth must be 16, 24, or 32, got {}",
                other
            )))
        }
    }

    writer.finalize()?;

    Ok(())
}

//! Decoding encoded sound assets into mono PCM

use crate::{AudioError, Result, SoundBuffer};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode audio data from bytes using Symphonia
///
/// `path` only feeds the format hint and the buffer name. Multi-channel audio
/// is averaged down to mono.
pub fn decode_audio(data: Vec<u8>, name: &str, path: &str) -> Result<SoundBuffer> {
    let cursor = Cursor::new(data);
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::DecodeError(format!("{}: failed to probe format: {}", path, e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::DecodeError(format!("{}: no valid audio track found", path)))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::DecodeError(format!("{}: failed to create decoder: {}", path, e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AudioError::DecodeError(format!("{}: format error: {}", path, e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                skip_packet(e, path)?;
                skipped += 1;
                continue;
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut interleaved = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        interleaved.copy_interleaved_ref(decoded);

        mono.extend(
            interleaved
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if mono.is_empty() {
        return Err(AudioError::DecodeError(format!(
            "{}: no audio frames decoded ({} packets skipped)",
            path, skipped
        )));
    }
    if skipped > 0 {
        tracing::warn!("{}: {} undecodable packets skipped", path, skipped);
    }

    SoundBuffer::new(name, mono, sample_rate)
}

/// A corrupt packet only costs its own frames; any other decoder error fails the asset
fn skip_packet(err: SymphoniaError, path: &str) -> Result<()> {
    match err {
        SymphoniaError::DecodeError(e) => {
            tracing::debug!("{}: skipping undecodable packet: {}", path, e);
            Ok(())
        }
        other => Err(AudioError::DecodeError(format!(
            "{}: failed to decode packet: {}",
            path, other
        ))),
    }
}

//! Sound bank: one decoded buffer per selectable sound, plus voice cues
//!
//! Every sound is resolved through an ordered chain of [`LoadStrategy`]
//! values. Sample-based sounds try their primary format, then a secondary
//! format, then the default synthesized click. Synthesized sounds try their own
//! routine. Every chain ends in the minimal square-wave click, so loading only
//! fails when even that cannot be rendered.

use crate::decode::decode_audio;
use crate::synth::{minimal_click, synthesize};
use crate::{AssetSource, AudioError, Result, SoundBuffer};
use futures::future::join_all;
use sleeptempo_core::{is_cue_beat, CueRegion, SoundId, SoundSource, SynthKind, VoiceCountOffsets};
use std::collections::HashMap;
use std::sync::Arc;

/// Preferred encoded format for sample-based sounds
pub const PRIMARY_EXTENSION: &str = "ogg";
/// More broadly decodable format tried when the primary one fails
pub const SECONDARY_EXTENSION: &str = "wav";
/// Stem of the concatenated voice-count buffer
pub const VOICE_CUE_STEM: &str = "voice/counts";
/// Offset table for the voice-count buffer
pub const VOICE_OFFSETS_PATH: &str = "voice/counts.json";

/// One way of producing a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStrategy {
    PrimaryAsset(String),
    SecondaryAsset(String),
    Synth(SynthKind),
    MinimalClick,
}

/// Which kind of strategy produced a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTier {
    Primary,
    Secondary,
    Synthesized,
    Minimal,
}

impl LoadStrategy {
    /// Ordered fallback chain for a sound
    pub fn chain_for(id: SoundId) -> Vec<LoadStrategy> {
        match id.source() {
            SoundSource::Synth(kind) => vec![LoadStrategy::Synth(kind), LoadStrategy::MinimalClick],
            SoundSource::Sample(stem) => vec![
                LoadStrategy::PrimaryAsset(format!("sounds/{}.{}", stem, PRIMARY_EXTENSION)),
                LoadStrategy::SecondaryAsset(format!("sounds/{}.{}", stem, SECONDARY_EXTENSION)),
                LoadStrategy::Synth(SynthKind::Triangle),
                LoadStrategy::MinimalClick,
            ],
        }
    }

    pub fn tier(&self) -> LoadTier {
        match self {
            LoadStrategy::PrimaryAsset(_) => LoadTier::Primary,
            LoadStrategy::SecondaryAsset(_) => LoadTier::Secondary,
            LoadStrategy::Synth(_) => LoadTier::Synthesized,
            LoadStrategy::MinimalClick => LoadTier::Minimal,
        }
    }

    async fn run(&self, assets: &dyn AssetSource, name: &str, sample_rate: u32) -> Result<SoundBuffer> {
        match self {
            LoadStrategy::PrimaryAsset(path) | LoadStrategy::SecondaryAsset(path) => {
                fetch_and_decode(assets, name, path).await
            }
            LoadStrategy::Synth(kind) => synthesize(*kind, name, sample_rate),
            LoadStrategy::MinimalClick => minimal_click(name, sample_rate),
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStrategy::PrimaryAsset(path) | LoadStrategy::SecondaryAsset(path) => f.write_str(path),
            LoadStrategy::Synth(kind) => write!(f, "synth:{:?}", kind),
            LoadStrategy::MinimalClick => f.write_str("minimal click"),
        }
    }
}

/// How one sound was resolved
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub id: SoundId,
    pub resolved: LoadStrategy,
    /// Strategies that failed before `resolved`, with the reason
    pub failures: Vec<(LoadStrategy, String)>,
}

impl LoadReport {
    /// True when the sound did not come from its first choice
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn tier(&self) -> LoadTier {
        self.resolved.tier()
    }
}

/// The concatenated voice-count buffer and where each number lives in it
#[derive(Debug, Clone)]
pub struct VoiceCues {
    pub buffer: SoundBuffer,
    pub offsets: VoiceCountOffsets,
}

impl VoiceCues {
    /// Region to play for an absolute beat number, if that beat gets a cue.
    ///
    /// Beats past the largest cataloged number (and past the hard cap at 100)
    /// get nothing.
    pub fn cue_for(&self, beat: u64) -> Option<CueRegion> {
        if !is_cue_beat(beat) {
            return None;
        }
        match self.offsets.max_cataloged_beat() {
            Some(max) if beat <= max => self.offsets.for_beat(beat),
            _ => None,
        }
    }
}

/// Decoded buffers for every selectable sound
#[derive(Debug, Clone)]
pub struct SoundBank {
    sample_rate: u32,
    sounds: HashMap<SoundId, SoundBuffer>,
    voice: Option<VoiceCues>,
    reports: Vec<LoadReport>,
}

impl SoundBank {
    /// An empty bank, filled with [`SoundBank::with_sound`]
    pub fn new(sample_rate: u32) -> Self {
        SoundBank {
            sample_rate,
            sounds: HashMap::new(),
            voice: None,
            reports: Vec::new(),
        }
    }

    pub fn with_sound(mut self, id: SoundId, buffer: SoundBuffer) -> Self {
        self.sounds.insert(id, buffer);
        self
    }

    pub fn with_voice_cues(mut self, cues: VoiceCues) -> Self {
        self.voice = Some(cues);
        self
    }

    /// Load every sound and the voice cues concurrently.
    ///
    /// Missing or broken assets only degrade the bank. The only failure is
    /// [`AudioError::EngineUnavailable`], when a sound's whole chain (minimal
    /// click included) failed.
    pub async fn load(assets: &dyn AssetSource, sample_rate: u32) -> Result<SoundBank> {
        tracing::info!("Loading sound bank from {} at {} Hz", assets.describe(), sample_rate);

        let sound_loads = SoundId::ALL
            .iter()
            .map(|&id| load_sound(assets, id, sample_rate));
        let (sounds, voice) = futures::join!(join_all(sound_loads), load_voice_cues(assets));

        let mut bank = SoundBank::new(sample_rate);
        for loaded in sounds {
            let (buffer, report) = loaded?;
            if report.is_degraded() {
                tracing::warn!(
                    "Sound {} fell back to {} after {} failure(s)",
                    report.id,
                    report.resolved,
                    report.failures.len()
                );
            }
            bank.sounds.insert(report.id, buffer);
            bank.reports.push(report);
        }
        bank.voice = voice;

        tracing::info!(
            "Sound bank ready: {} sounds, voice cues {}",
            bank.sounds.len(),
            if bank.voice.is_some() { "enabled" } else { "disabled" }
        );
        Ok(bank)
    }

    /// Build a fresh bank from the same kind of source
    pub async fn reload(&self, assets: &dyn AssetSource) -> Result<SoundBank> {
        SoundBank::load(assets, self.sample_rate).await
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn get(&self, id: SoundId) -> Option<&SoundBuffer> {
        self.sounds.get(&id)
    }

    /// Look a sound up by settings key; unknown keys are simply absent
    pub fn lookup(&self, key: &str) -> Option<&SoundBuffer> {
        key.parse::<SoundId>().ok().and_then(|id| self.get(id))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn voice_cues(&self) -> Option<&VoiceCues> {
        self.voice.as_ref()
    }

    pub fn reports(&self) -> &[LoadReport] {
        &self.reports
    }

    pub fn report(&self, id: SoundId) -> Option<&LoadReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

/// Walk one sound's fallback chain
async fn load_sound(
    assets: &dyn AssetSource,
    id: SoundId,
    sample_rate: u32,
) -> Result<(SoundBuffer, LoadReport)> {
    let name = id.key();
    let mut failures = Vec::new();

    for strategy in LoadStrategy::chain_for(id) {
        match strategy.run(assets, name, sample_rate).await {
            Ok(buffer) => {
                tracing::debug!("Loaded {} via {} ({:.3}s)", name, strategy, buffer.duration());
                let report = LoadReport {
                    id,
                    resolved: strategy,
                    failures,
                };
                return Ok((buffer, report));
            }
            Err(e) => {
                tracing::debug!("{} via {} failed: {}", name, strategy, e);
                failures.push((strategy, e.to_string()));
            }
        }
    }

    let reasons: Vec<String> = failures
        .iter()
        .map(|(strategy, reason)| format!("{}: {}", strategy, reason))
        .collect();
    Err(AudioError::EngineUnavailable(format!(
        "no way to produce {} ({})",
        name,
        reasons.join("; ")
    )))
}

/// Load the voice-count buffer and its offsets; any failure disables cues
async fn load_voice_cues(assets: &dyn AssetSource) -> Option<VoiceCues> {
    let primary = format!("{}.{}", VOICE_CUE_STEM, PRIMARY_EXTENSION);
    let secondary = format!("{}.{}", VOICE_CUE_STEM, SECONDARY_EXTENSION);

    let (buffer, offsets) = futures::join!(
        async {
            match fetch_and_decode(assets, "voice", &primary).await {
                Ok(buffer) => Ok(buffer),
                Err(e) => {
                    tracing::debug!("Voice cues via {} failed: {}", primary, e);
                    fetch_and_decode(assets, "voice", &secondary).await
                }
            }
        },
        fetch_offsets(assets)
    );

    match (buffer, offsets) {
        (Ok(buffer), Ok(offsets)) if !offsets.is_empty() => Some(VoiceCues { buffer, offsets }),
        (Ok(_), Ok(_)) => {
            tracing::warn!("Voice cue offset table is empty; voice cues disabled");
            None
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Voice cues unavailable, continuing with clicks only: {}", e);
            None
        }
    }
}

async fn fetch_offsets(assets: &dyn AssetSource) -> Result<VoiceCountOffsets> {
    let bytes = assets.fetch(VOICE_OFFSETS_PATH).await?;
    let json = String::from_utf8(bytes)
        .map_err(|e| AudioError::AssetError(format!("{}: {}", VOICE_OFFSETS_PATH, e)))?;
    Ok(VoiceCountOffsets::from_json(&json)?)
}

async fn fetch_and_decode(assets: &dyn AssetSource, name: &str, path: &str) -> Result<SoundBuffer> {
    let bytes = assets.fetch(path).await?;
    let name = name.to_string();
    let path = path.to_string();
    tokio::task::spawn_blocking(move || decode_audio(bytes, &name, &path))
        .await
        .map_err(|e| AudioError::Other(format!("decode task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryAssets;
    use std::io::Cursor;

    fn wav_bytes(frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                writer.write_sample(if i % 2 == 0 { 8000i16 } else { -8000 }).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    const OFFSETS: &str = r#"{ "10": { "start": 0.0, "duration": 0.1 }, "20": { "start": 0.1, "duration": 0.1 } }"#;

    #[test]
    fn test_chains() {
        assert_eq!(
            LoadStrategy::chain_for(SoundId::Woodblock),
            vec![LoadStrategy::Synth(SynthKind::Woodblock), LoadStrategy::MinimalClick]
        );
        assert_eq!(
            LoadStrategy::chain_for(SoundId::Snap),
            vec![
                LoadStrategy::PrimaryAsset("sounds/snap.ogg".to_string()),
                LoadStrategy::SecondaryAsset("sounds/snap.wav".to_string()),
                LoadStrategy::Synth(SynthKind::Triangle),
                LoadStrategy::MinimalClick,
            ]
        );
    }

    #[tokio::test]
    async fn test_no_assets_still_loads_every_sound() {
        let bank = SoundBank::load(&MemoryAssets::new(), 48000).await.unwrap();
        assert_eq!(bank.len(), SoundId::ALL.len());
        assert!(bank.voice_cues().is_none());

        let woodblock = bank.report(SoundId::Woodblock).unwrap();
        assert!(!woodblock.is_degraded());
        assert_eq!(woodblock.tier(), LoadTier::Synthesized);

        let snap = bank.report(SoundId::Snap).unwrap();
        assert!(snap.is_degraded());
        assert_eq!(snap.resolved, LoadStrategy::Synth(SynthKind::Triangle));
        assert_eq!(snap.failures.len(), 2);
        assert_eq!(bank.get(SoundId::Snap).unwrap().name, "SNAP");
    }

    #[tokio::test]
    async fn test_secondary_format_used_when_primary_missing() {
        let assets = MemoryAssets::new().with("sounds/tongue.wav", wav_bytes(441));
        let bank = SoundBank::load(&assets, 48000).await.unwrap();

        let report = bank.report(SoundId::Tongue).unwrap();
        assert_eq!(report.tier(), LoadTier::Secondary);
        assert_eq!(bank.get(SoundId::Tongue).unwrap().frames(), 441);
        assert_eq!(bank.get(SoundId::Tongue).unwrap().sample_rate, 44100);
    }

    #[tokio::test]
    async fn test_corrupt_primary_falls_through() {
        let assets = MemoryAssets::new()
            .with("sounds/airpod.ogg", b"garbage".to_vec())
            .with("sounds/airpod.wav", wav_bytes(100));
        let bank = SoundBank::load(&assets, 48000).await.unwrap();

        let report = bank.report(SoundId::Airpod).unwrap();
        assert_eq!(report.tier(), LoadTier::Secondary);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].1.contains("decode"));
    }

    #[tokio::test]
    async fn test_voice_cues_loaded() {
        let assets = MemoryAssets::new()
            .with("voice/counts.wav", wav_bytes(44100))
            .with(VOICE_OFFSETS_PATH, OFFSETS.as_bytes().to_vec());
        let bank = SoundBank::load(&assets, 48000).await.unwrap();

        let cues = bank.voice_cues().expect("voice cues should load");
        assert_eq!(cues.cue_for(10), Some(CueRegion::new(0.0, 0.1)));
        assert_eq!(cues.cue_for(20), Some(CueRegion::new(0.1, 0.1)));
        assert_eq!(cues.cue_for(15), None);
        // past the largest cataloged number
        assert_eq!(cues.cue_for(30), None);
    }

    #[tokio::test]
    async fn test_voice_cues_disabled_when_offsets_missing() {
        let assets = MemoryAssets::new().with("voice/counts.wav", wav_bytes(44100));
        let bank = SoundBank::load(&assets, 48000).await.unwrap();
        assert!(bank.voice_cues().is_none());
        assert_eq!(bank.len(), SoundId::ALL.len());
    }

    #[tokio::test]
    async fn test_voice_cues_disabled_when_offsets_broken() {
        let assets = MemoryAssets::new()
            .with("voice/counts.wav", wav_bytes(44100))
            .with(VOICE_OFFSETS_PATH, b"{ not json".to_vec());
        let bank = SoundBank::load(&assets, 48000).await.unwrap();
        assert!(bank.voice_cues().is_none());
    }

    #[tokio::test]
    async fn test_unusable_sample_rate_is_fatal() {
        let result = SoundBank::load(&MemoryAssets::new(), 0).await;
        assert!(matches!(result, Err(AudioError::EngineUnavailable(_))));
    }

    #[tokio::test]
    async fn test_reload_builds_a_new_bank() {
        let bank = SoundBank::load(&MemoryAssets::new(), 44100).await.unwrap();
        assert!(bank.report(SoundId::Heartbeat).unwrap().is_degraded());

        let assets = MemoryAssets::new().with("sounds/heartbeat.wav", wav_bytes(2000));
        let reloaded = bank.reload(&assets).await.unwrap();
        assert_eq!(reloaded.sample_rate(), 44100);
        assert_eq!(reloaded.report(SoundId::Heartbeat).unwrap().tier(), LoadTier::Secondary);
    }

    #[test]
    fn test_lookup_by_key() {
        let click = minimal_click("DEFAULT", 44100).unwrap();
        let bank = SoundBank::new(44100).with_sound(SoundId::Default, click);
        assert!(bank.contains("DEFAULT"));
        assert!(!bank.contains("RIMSHOT"));
        assert!(!bank.contains("BANJO"));
    }
}

//! The audio clock seam between the scheduler and whatever renders audio
//!
//! Times are seconds on the clock's own monotonic timeline. The scheduler only
//! ever submits future-timed buffers and cancellations; it never waits on the
//! rendering side.

use crate::{AudioError, CueRegion, Mixer, Result, SoundBuffer, Voice};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Handle to one scheduled buffer playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    pub(crate) fn new(raw: u64) -> Self {
        VoiceId(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// Host audio connection
///
/// Implementations use interior mutability; the scheduler shares its clock
/// behind an `Arc` with whoever drives the output.
pub trait AudioClock {
    /// Current time in seconds
    fn now(&self) -> f64;

    fn sample_rate(&self) -> u32;

    /// Start `region` of `buffer` (all of it when `None`) at time `at`
    fn schedule(&self, buffer: &SoundBuffer, at: f64, region: Option<CueRegion>) -> Result<VoiceId>;

    /// Cut a scheduled voice off at time `at`. Unknown or finished voices are ignored.
    fn halt(&self, voice: VoiceId, at: f64);

    /// Resume output if suspended; calling it while running does nothing
    fn resume(&self) -> Result<()>;

    fn is_suspended(&self) -> bool;
}

/// Convert clock seconds to an absolute frame index
pub(crate) fn seconds_to_frame(seconds: f64, sample_rate: u32) -> u64 {
    (seconds.max(0.0) * sample_rate as f64).round() as u64
}

/// One buffer submitted to an [`OfflineClock`]
#[derive(Debug, Clone)]
pub struct TriggerRecord {
    pub voice: VoiceId,
    /// Buffer name (`"RIMSHOT"`, `"voice"`, ...)
    pub name: String,
    pub at: f64,
    pub region: Option<CueRegion>,
    /// Set when the voice was halted
    pub halted_at: Option<f64>,
    pub buffer: SoundBuffer,
}

impl TriggerRecord {
    /// Whether any of this trigger reaches the output
    pub fn is_audible(&self) -> bool {
        self.halted_at.map_or(true, |halted| halted > self.at)
    }

    /// Time the trigger stops sounding, halts included
    pub fn ends_at(&self) -> f64 {
        let natural = self.at + self.buffer.region_duration(self.region);
        self.halted_at.map_or(natural, |halted| halted.clamp(self.at, natural))
    }
}

/// A clock whose time only moves when told to
///
/// Records every trigger so tests and the WAV exporter can inspect or mix
/// them afterwards. It starts suspended, like a fresh output device.
#[derive(Debug)]
pub struct OfflineClock {
    sample_rate: u32,
    now: Mutex<f64>,
    suspended: AtomicBool,
    reject_schedules: AtomicBool,
    next_id: AtomicU64,
    triggers: Mutex<Vec<TriggerRecord>>,
}

impl OfflineClock {
    pub fn new(sample_rate: u32) -> Self {
        OfflineClock {
            sample_rate,
            now: Mutex::new(0.0),
            suspended: AtomicBool::new(true),
            reject_schedules: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            triggers: Mutex::new(Vec::new()),
        }
    }

    /// Move time to `seconds`; time never runs backwards
    pub fn set_time(&self, seconds: f64) {
        let mut now = self.now.lock();
        *now = now.max(seconds);
    }

    pub fn advance_by(&self, seconds: f64) {
        *self.now.lock() += seconds.max(0.0);
    }

    /// Make every following `schedule` call fail, to exercise skip paths
    pub fn set_reject_schedules(&self, reject: bool) {
        self.reject_schedules.store(reject, Ordering::Relaxed);
    }

    pub fn triggers(&self) -> Vec<TriggerRecord> {
        self.triggers.lock().clone()
    }

    pub fn triggers_named(&self, name: &str) -> Vec<TriggerRecord> {
        self.triggers
            .lock()
            .iter()
            .filter(|t| t.name == name)
            .cloned()
            .collect()
    }

    /// Mix every recorded trigger into `seconds` of interleaved audio
    pub fn render(&self, seconds: f64, channels: usize) -> Vec<f32> {
        let channels = channels.max(1);
        let frames = seconds_to_frame(seconds, self.sample_rate) as usize;
        let mut mixer = Mixer::new(self.sample_rate);

        for trigger in self.triggers.lock().iter() {
            let mut voice = Voice::new(
                trigger.voice,
                trigger.buffer.clone(),
                trigger.region,
                seconds_to_frame(trigger.at, self.sample_rate),
            );
            if let Some(halted) = trigger.halted_at {
                voice.halt_at(seconds_to_frame(halted, self.sample_rate));
            }
            mixer.add(voice);
        }

        let mut out = vec![0.0f32; frames * channels];
        mixer.fill_buffer(&mut out, channels, 0);
        out
    }
}

impl AudioClock for OfflineClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn schedule(&self, buffer: &SoundBuffer, at: f64, region: Option<CueRegion>) -> Result<VoiceId> {
        if self.reject_schedules.load(Ordering::Relaxed) {
            return Err(AudioError::Other(format!("offline clock rejected {}", buffer.name)));
        }
        let voice = VoiceId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.triggers.lock().push(TriggerRecord {
            voice,
            name: buffer.name.clone(),
            at,
            region,
            halted_at: None,
            buffer: buffer.clone(),
        });
        Ok(voice)
    }

    fn halt(&self, voice: VoiceId, at: f64) {
        if let Some(trigger) = self.triggers.lock().iter_mut().find(|t| t.voice == voice) {
            trigger.halted_at = Some(trigger.halted_at.map_or(at, |h| h.min(at)));
        }
    }

    fn resume(&self) -> Result<()> {
        self.suspended.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click() -> SoundBuffer {
        SoundBuffer::new("click", vec![1.0; 10], 1000).unwrap()
    }

    #[test]
    fn test_time_is_monotonic() {
        let clock = OfflineClock::new(1000);
        clock.set_time(1.5);
        clock.set_time(1.0);
        assert_eq!(clock.now(), 1.5);
        clock.advance_by(0.5);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_records_and_halts() {
        let clock = OfflineClock::new(1000);
        let first = clock.schedule(&click(), 0.1, None).unwrap();
        let second = clock.schedule(&click(), 0.2, Some(CueRegion::new(0.0, 0.005))).unwrap();
        assert_ne!(first, second);

        clock.halt(second, 0.15);
        let triggers = clock.triggers();
        assert!(triggers[0].is_audible());
        assert!(!triggers[1].is_audible());
        assert_eq!(triggers[1].ends_at(), 0.2);
        assert!((triggers[0].ends_at() - 0.11).abs() < 1e-9);
    }

    #[test]
    fn test_render_places_energy() {
        let clock = OfflineClock::new(1000);
        clock.schedule(&click(), 0.1, None).unwrap();
        let out = clock.render(0.2, 2);
        assert_eq!(out.len(), 400);
        assert_eq!(out[2 * 99], 0.0);
        assert_eq!(out[2 * 100], 1.0);
        assert_eq!(out[2 * 100 + 1], 1.0);
        assert_eq!(out[2 * 110], 0.0);
    }

    #[test]
    fn test_rejected_schedules() {
        let clock = OfflineClock::new(1000);
        clock.set_reject_schedules(true);
        assert!(clock.schedule(&click(), 0.0, None).is_err());
        assert!(clock.triggers().is_empty());
    }

    #[test]
    fn test_resume() {
        let clock = OfflineClock::new(1000);
        assert!(clock.is_suspended());
        clock.resume().unwrap();
        clock.resume().unwrap();
        assert!(!clock.is_suspended());
    }
}

//! Look-ahead scheduler for one tempo step
//!
//! Clicks are submitted to the audio clock ahead of time. Each tick fills the
//! window `[now, now + lookahead)` with triggers, then asks to be woken again
//! after `schedule_interval`. Because the interval is shorter than the window,
//! every beat is submitted before it is due even when a wakeup runs late.
//!
//! All timers live on the audio clock's timeline. The host calls
//! [`Scheduler::advance`] whenever it wakes up and uses
//! [`Scheduler::next_wakeup`] to decide how long to sleep.

use crate::{AudioClock, AudioError, Result, SoundBank, SoundBuffer, VoiceId};
use sleeptempo_core::{is_cue_beat, SettingsUpdate, SoundId, TempoStep};
use std::sync::Arc;

/// Completion handler; one slot per scheduler
pub type EndedHandler = Box<dyn FnMut() + Send>;

/// Timing constants, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Guard offset before the first click of a step
    pub startup_latency: f64,
    /// How far ahead of the clock triggers are submitted
    pub lookahead: f64,
    /// Polling interval between ticks
    pub schedule_interval: f64,
    /// Skew between a click and its voice cue
    pub voice_delay: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            startup_latency: 0.05,
            lookahead: 0.1,
            schedule_interval: 0.025,
            voice_delay: 0.1,
        }
    }
}

impl EngineConfig {
    pub fn new(startup_latency: f64, lookahead: f64, schedule_interval: f64, voice_delay: f64) -> Result<Self> {
        let config = EngineConfig {
            startup_latency,
            lookahead,
            schedule_interval,
            voice_delay,
        };
        config.validate()?;
        Ok(config)
    }

    /// The polling interval must stay under the lookahead window, otherwise
    /// beats can fall into a gap between ticks
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("startup_latency", self.startup_latency),
            ("lookahead", self.lookahead),
            ("schedule_interval", self.schedule_interval),
            ("voice_delay", self.voice_delay),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(AudioError::InvalidConfig(format!("{} must be a non-negative number, got {}", name, value)));
        }
        if self.schedule_interval <= 0.0 {
            return Err(AudioError::InvalidConfig("schedule_interval must be positive".to_string()));
        }
        if self.schedule_interval >= self.lookahead {
            return Err(AudioError::InvalidConfig(format!(
                "schedule_interval ({}s) must be shorter than lookahead ({}s)",
                self.schedule_interval, self.lookahead
            )));
        }
        Ok(())
    }
}

/// Per-step playback state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    /// Absolute clock time of the next click
    pub next_trigger_time: f64,
    pub beats_elapsed_in_step: u32,
    /// Beats played by earlier steps of the ladder
    pub segment_start_beat_offset: u64,
    pub step: Option<TempoStep>,
}

impl PlaybackState {
    /// 1-based beat number across the whole ladder for the next click
    pub fn absolute_beat(&self) -> u64 {
        self.segment_start_beat_offset + self.beats_elapsed_in_step as u64 + 1
    }
}

/// A trigger still tracked for cancellation
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledVoice {
    id: VoiceId,
    ends_at: f64,
}

/// Plays exactly one [`TempoStep`] at a time
pub struct Scheduler<C: AudioClock> {
    clock: Arc<C>,
    config: EngineConfig,
    bank: Option<Arc<SoundBank>>,
    /// Most recently requested sound key
    selected_sound: String,
    active_buffer: Option<SoundBuffer>,
    voice_count_enabled: bool,
    state: PlaybackState,
    voices: Vec<ScheduledVoice>,
    tick_due: Option<f64>,
    completion_due: Option<f64>,
    on_ended: Option<EndedHandler>,
}

impl<C: AudioClock> Scheduler<C> {
    pub fn new(clock: Arc<C>, config: EngineConfig) -> Self {
        Scheduler {
            clock,
            config,
            bank: None,
            selected_sound: SoundId::Default.key().to_string(),
            active_buffer: None,
            voice_count_enabled: true,
            state: PlaybackState::default(),
            voices: Vec::new(),
            tick_due: None,
            completion_due: None,
            on_ended: None,
        }
    }

    pub fn clock(&self) -> &Arc<C> {
        &self.clock
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    /// True once a click buffer is available
    pub fn is_ready(&self) -> bool {
        self.active_buffer.is_some()
    }

    pub fn bank(&self) -> Option<&Arc<SoundBank>> {
        self.bank.as_ref()
    }

    pub fn active_buffer(&self) -> Option<&SoundBuffer> {
        self.active_buffer.as_ref()
    }

    pub fn selected_sound(&self) -> &str {
        &self.selected_sound
    }

    pub fn voice_count_enabled(&self) -> bool {
        self.voice_count_enabled
    }

    /// Triggers that may still be sounding
    pub fn tracked_voices(&self) -> usize {
        self.voices.len()
    }

    /// Install a (possibly reloaded) bank and re-resolve the selected sound
    ///
    /// If the selection is missing from the new bank, the previous buffer is
    /// kept; with no previous buffer the default click is used.
    pub fn attach_bank(&mut self, bank: Arc<SoundBank>) {
        let resolved = bank.lookup(&self.selected_sound).cloned();
        self.bank = Some(Arc::clone(&bank));

        match resolved {
            Some(buffer) => self.active_buffer = Some(buffer),
            None => {
                tracing::warn!("Sound {} unavailable in the loaded bank", self.selected_sound);
                if self.active_buffer.is_none() {
                    self.active_buffer = bank.get(SoundId::Default).cloned();
                }
            }
        }
    }

    /// Record the sound to resolve when a bank is attached
    pub fn select_sound(&mut self, key: &str) {
        self.selected_sound = key.to_string();
    }

    /// Switch the click timbre. On failure the previous buffer stays active.
    pub fn set_active_sound(&mut self, key: &str) -> Result<()> {
        self.selected_sound = key.to_string();

        let buffer = self.bank.as_ref().and_then(|bank| bank.lookup(key));
        match buffer {
            Some(buffer) => {
                tracing::debug!("Active sound is now {}", key);
                self.active_buffer = Some(buffer.clone());
                Ok(())
            }
            None => {
                tracing::warn!("Sound {} unavailable, keeping the previous click", key);
                Err(AudioError::SoundUnavailable(key.to_string()))
            }
        }
    }

    pub fn set_voice_count_enabled(&mut self, enabled: bool) {
        self.voice_count_enabled = enabled;
    }

    /// Apply sound and voice changes; they take effect on the next trigger
    pub fn update_settings(&mut self, update: &SettingsUpdate) {
        if let Some(sound) = &update.sound {
            // unavailable sounds are already logged and keep the old buffer
            let _ = self.set_active_sound(sound);
        }
        if let Some(enabled) = update.voice_count_enabled {
            self.set_voice_count_enabled(enabled);
        }
    }

    /// Register the completion handler, replacing any previous one
    pub fn set_on_ended(&mut self, handler: impl FnMut() + Send + 'static) {
        self.on_ended = Some(Box::new(handler));
    }

    pub fn clear_on_ended(&mut self) {
        self.on_ended = None;
    }

    pub fn has_on_ended(&self) -> bool {
        self.on_ended.is_some()
    }

    /// Begin playing `step`, numbering its beats after `overall_beat_offset`
    pub fn start(&mut self, step: TempoStep, overall_beat_offset: u64) -> Result<()> {
        if self.state.is_playing {
            return Err(AudioError::AlreadyPlaying);
        }
        if self.active_buffer.is_none() {
            return Err(AudioError::EngineNotReady);
        }
        step.validate()?;

        if self.clock.is_suspended() {
            if let Err(e) = self.clock.resume() {
                tracing::warn!("Could not resume audio output: {}", e);
            }
        }

        let now = self.clock.now();
        self.state = PlaybackState {
            is_playing: true,
            next_trigger_time: now + self.config.startup_latency,
            beats_elapsed_in_step: 0,
            segment_start_beat_offset: overall_beat_offset,
            step: Some(step),
        };
        self.completion_due = None;
        tracing::debug!("Starting step {} at beat offset {}", step, overall_beat_offset);

        self.tick(now);
        Ok(())
    }

    /// Fire every timer that is due at the clock's current time
    pub fn advance(&mut self) {
        let now = self.clock.now();
        self.voices.retain(|v| v.ends_at > now);

        if self.tick_due.is_some_and(|due| due <= now) {
            self.tick(now);
        }
        if self.completion_due.is_some_and(|due| due <= now) {
            self.complete();
        }
    }

    /// Earliest pending timer, in clock time
    pub fn next_wakeup(&self) -> Option<f64> {
        match (self.tick_due, self.completion_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop playback, halting every in-flight trigger at the current time.
    ///
    /// Idempotent. When idle this only silences the tail left by a natural
    /// completion. `notify` invokes the completion handler, and only while
    /// playing.
    pub fn stop(&mut self, notify: bool) {
        let now = self.clock.now();
        for voice in self.voices.drain(..) {
            self.clock.halt(voice.id, now);
        }
        if !self.state.is_playing {
            return;
        }
        self.tick_due = None;
        self.completion_due = None;
        self.state = PlaybackState::default();
        tracing::debug!("Scheduler stopped at {:.3}s", now);

        if notify {
            self.notify_ended();
        }
    }

    fn tick(&mut self, now: f64) {
        self.tick_due = None;
        let Some(step) = self.state.step.filter(|_| self.state.is_playing) else {
            return;
        };

        let horizon = now + self.config.lookahead;
        while self.state.next_trigger_time < horizon {
            let at = self.state.next_trigger_time;
            self.schedule_click(at);
            self.schedule_voice_cue(self.state.absolute_beat(), at);

            self.state.next_trigger_time += step.seconds_per_beat();
            self.state.beats_elapsed_in_step += 1;

            if self.state.beats_elapsed_in_step >= step.beats {
                self.completion_due = Some(self.state.next_trigger_time);
                return;
            }
        }
        self.tick_due = Some(now + self.config.schedule_interval);
    }

    fn schedule_click(&mut self, at: f64) {
        let Some(buffer) = self.active_buffer.as_ref() else {
            tracing::warn!("No click buffer at {:.3}s, skipping beat", at);
            return;
        };
        match self.clock.schedule(buffer, at, None) {
            Ok(id) => {
                tracing::trace!("Click {} at {:.3}s", buffer.name, at);
                self.voices.push(ScheduledVoice {
                    id,
                    ends_at: at + buffer.duration(),
                });
            }
            Err(e) => tracing::warn!("Failed to schedule click at {:.3}s: {}", at, e),
        }
    }

    fn schedule_voice_cue(&mut self, beat: u64, click_at: f64) {
        if !self.voice_count_enabled {
            return;
        }
        let Some(cues) = self.bank.as_ref().and_then(|bank| bank.voice_cues()) else {
            return;
        };
        let Some(region) = cues.cue_for(beat) else {
            let in_catalog = cues.offsets.max_cataloged_beat().is_some_and(|max| beat <= max);
            if is_cue_beat(beat) && in_catalog {
                tracing::warn!("No voice cue offset for beat {}, skipping", beat);
            }
            return;
        };

        let at = click_at + self.config.voice_delay;
        match self.clock.schedule(&cues.buffer, at, Some(region)) {
            Ok(id) => {
                tracing::debug!("Voice cue for beat {} at {:.3}s", beat, at);
                self.voices.push(ScheduledVoice {
                    id,
                    ends_at: at + cues.buffer.region_duration(Some(region)),
                });
            }
            Err(e) => tracing::warn!("Failed to schedule voice cue for beat {}: {}", beat, e),
        }
    }

    /// Natural end of the step. Ringing voices stay tracked so a stop right
    /// after can still silence them.
    fn complete(&mut self) {
        self.completion_due = None;
        if !self.state.is_playing {
            return;
        }
        self.tick_due = None;
        self.state = PlaybackState::default();
        self.notify_ended();
    }

    fn notify_ended(&mut self) {
        match self.on_ended.as_mut() {
            Some(handler) => handler(),
            None => tracing::warn!("Step ended with no completion handler registered"),
        }
    }
}

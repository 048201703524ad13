//! High-level player: what a UI binds its play button to

use crate::{AssetSource, AudioClock, AudioError, EngineConfig, Result, Scheduler, Sequencer, SoundBank};
use sleeptempo_core::{Settings, SettingsUpdate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Configuration for the player
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub engine: EngineConfig,
    /// Shortest sleep a host loop should take between advances
    pub min_sleep: Duration,
    /// Longest sleep while nothing is scheduled (e.g. waiting for the bank)
    pub idle_sleep: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            engine: EngineConfig::default(),
            min_sleep: Duration::from_millis(1),
            idle_sleep: Duration::from_millis(25),
        }
    }
}

/// Settings-driven ladder playback with asynchronous bank loading
pub struct Player<C: AudioClock> {
    sequencer: Sequencer<C>,
    settings: Settings,
    config: PlayerConfig,
    pending_bank: Option<oneshot::Receiver<Result<SoundBank>>>,
}

impl<C: AudioClock> Player<C> {
    pub fn new(clock: Arc<C>, settings: Settings, config: PlayerConfig) -> Self {
        let mut scheduler = Scheduler::new(clock, config.engine);
        scheduler.select_sound(&settings.sound);
        scheduler.set_voice_count_enabled(settings.voice_count_enabled);

        let mut sequencer = Sequencer::new(scheduler);
        sequencer.update_settings(&SettingsUpdate::ladder(settings.ladder.clone()));

        Player {
            sequencer,
            settings,
            config,
            pending_bank: None,
        }
    }

    /// Create a player with default settings and configuration
    pub fn with_defaults(clock: Arc<C>) -> Self {
        Self::new(clock, Settings::default(), PlayerConfig::default())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn sequencer(&self) -> &Sequencer<C> {
        &self.sequencer
    }

    pub fn clock(&self) -> &Arc<C> {
        self.sequencer.scheduler().clock()
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_running()
    }

    /// True once a click buffer can be played
    pub fn is_engine_ready(&self) -> bool {
        self.sequencer.scheduler().is_ready()
    }

    /// True while a bank load started by [`Player::begin_loading`] is in flight
    pub fn is_loading(&self) -> bool {
        self.pending_bank.is_some()
    }

    pub fn set_on_sequence_end(&mut self, handler: impl FnMut() + Send + 'static) {
        self.sequencer.set_on_sequence_end(handler);
    }

    /// Start loading the sound bank on the tokio runtime
    ///
    /// Must be called from within a runtime. The bank is attached by the next
    /// [`Player::advance`] after loading finishes, or by [`Player::wait_ready`].
    pub fn begin_loading(&mut self, assets: Arc<dyn AssetSource>) {
        let sample_rate = self.clock().sample_rate();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let result = SoundBank::load(assets.as_ref(), sample_rate).await;
            // the player may have been dropped meanwhile
            let _ = tx.send(result);
        });
        self.pending_bank = Some(rx);
    }

    /// Wait for a load started by [`Player::begin_loading`] and attach the bank
    pub async fn wait_ready(&mut self) -> Result<()> {
        let Some(rx) = self.pending_bank.take() else {
            return Ok(());
        };
        let bank = rx
            .await
            .map_err(|_| AudioError::EngineUnavailable("sound bank loader exited".to_string()))??;
        self.attach_bank(Arc::new(bank));
        Ok(())
    }

    /// Install a bank directly, for hosts that load synchronously
    pub fn attach_bank(&mut self, bank: Arc<SoundBank>) {
        self.sequencer.attach_bank(bank);
        tracing::info!("Engine ready with sound {}", self.settings.sound);
    }

    /// Attach the bank if its load has finished. Load failures are fatal.
    fn poll_bank(&mut self) -> Result<()> {
        let Some(rx) = self.pending_bank.as_mut() else {
            return Ok(());
        };
        match rx.try_recv() {
            Ok(loaded) => {
                self.pending_bank = None;
                self.attach_bank(Arc::new(loaded?));
                Ok(())
            }
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                self.pending_bank = None;
                Err(AudioError::EngineUnavailable("sound bank loader exited".to_string()))
            }
        }
    }

    /// Play if idle, stop if playing. Returns the new playing state.
    pub fn toggle_play(&mut self) -> Result<bool> {
        if self.is_playing() {
            self.stop();
            return Ok(false);
        }
        self.start()?;
        Ok(true)
    }

    /// Play the ladder from the current settings
    pub fn start(&mut self) -> Result<()> {
        if !self.is_engine_ready() {
            return Err(AudioError::EngineNotReady);
        }
        self.sequencer.start_configured()
    }

    pub fn stop(&mut self) {
        self.sequencer.stop();
    }

    /// Merge a partial update; sound and voice changes apply to the next trigger
    pub fn update_settings(&mut self, update: SettingsUpdate) {
        self.settings.apply(&update);
        self.sequencer.update_settings(&update);
    }

    /// Attach a finished bank load, then run due timers
    pub fn advance(&mut self) -> Result<()> {
        self.poll_bank()?;
        self.sequencer.advance()
    }

    /// Clock time of the next timer
    pub fn next_wakeup(&self) -> Option<f64> {
        self.sequencer.next_wakeup()
    }

    /// How long a host loop may sleep before calling [`Player::advance`]
    pub fn sleep_hint(&self) -> Duration {
        let Some(due) = self.next_wakeup() else {
            return self.config.idle_sleep;
        };
        let wait = (due - self.clock().now()).max(0.0);
        Duration::from_secs_f64(wait).clamp(self.config.min_sleep, self.config.idle_sleep)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryAssets, OfflineClock};
    use sleeptempo_core::{Ladder, SoundId, TempoStep};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SR: u32 = 48000;

    fn short_settings() -> Settings {
        Settings {
            ladder: Ladder::new(vec![TempoStep::new(120.0, 2)]).unwrap(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_not_ready_until_bank_loaded() {
        let clock = Arc::new(OfflineClock::new(SR));
        let mut player = Player::new(Arc::clone(&clock), short_settings(), PlayerConfig::default());

        assert!(!player.is_engine_ready());
        assert!(matches!(player.toggle_play(), Err(AudioError::EngineNotReady)));
        assert!(!player.is_playing());

        player.begin_loading(Arc::new(MemoryAssets::new()));
        assert!(player.is_loading());
        player.wait_ready().await.unwrap();

        assert!(player.is_engine_ready());
        assert!(player.toggle_play().unwrap());
        assert!(player.is_playing());
        assert!(!player.toggle_play().unwrap());
        assert!(!player.is_playing());
    }

    #[tokio::test]
    async fn test_advance_attaches_loaded_bank() {
        let clock = Arc::new(OfflineClock::new(SR));
        let mut player = Player::new(Arc::clone(&clock), short_settings(), PlayerConfig::default());
        player.begin_loading(Arc::new(MemoryAssets::new()));

        for _ in 0..200 {
            player.advance().unwrap();
            if player.is_engine_ready() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(player.is_engine_ready());
        assert!(!player.is_loading());
    }

    #[tokio::test]
    async fn test_fatal_load_surfaces() {
        let clock = Arc::new(OfflineClock::new(0));
        let mut player = Player::with_defaults(clock);
        player.begin_loading(Arc::new(MemoryAssets::new()));
        assert!(matches!(
            player.wait_ready().await,
            Err(AudioError::EngineUnavailable(_))
        ));
        assert!(!player.is_engine_ready());
    }

    #[test]
    fn test_sequence_end_and_settings() {
        let clock = Arc::new(OfflineClock::new(SR));
        let mut player = Player::new(Arc::clone(&clock), short_settings(), PlayerConfig::default());
        let bank = SoundBank::new(SR)
            .with_sound(SoundId::Default, crate::synth::minimal_click("DEFAULT", SR).unwrap())
            .with_sound(SoundId::Snap, crate::synth::minimal_click("SNAP", SR).unwrap());
        player.attach_bank(Arc::new(bank));

        let ended = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&ended);
        player.set_on_sequence_end(move || {
            handle.fetch_add(1, Ordering::SeqCst);
        });

        player.update_settings(SettingsUpdate::sound("SNAP"));
        assert_eq!(player.settings().sound, "SNAP");
        player.toggle_play().unwrap();

        while let Some(due) = player.next_wakeup() {
            clock.set_time(due);
            player.advance().unwrap();
        }
        assert_eq!(ended.load(Ordering::SeqCst), 1);
        assert!(!player.is_playing());
        assert!(clock.triggers().iter().all(|t| t.name == "SNAP"));
        assert_eq!(clock.triggers().len(), 2);
    }

    #[test]
    fn test_sleep_hint_bounds() {
        let clock = Arc::new(OfflineClock::new(SR));
        let player = Player::with_defaults(Arc::clone(&clock));
        assert_eq!(player.sleep_hint(), Duration::from_millis(25));
    }

    #[test]
    fn test_sleep_hint_tracks_next_timer() {
        let clock = Arc::new(OfflineClock::new(SR));
        let mut player = Player::new(Arc::clone(&clock), short_settings(), PlayerConfig::default());
        player.attach_bank(Arc::new(
            SoundBank::new(SR).with_sound(SoundId::Default, crate::synth::minimal_click("DEFAULT", SR).unwrap()),
        ));
        player.start().unwrap();
        let config = player.config().clone();

        for now in [0.0, 0.01, 0.02, 0.024] {
            clock.set_time(now);
            let due = player.next_wakeup().unwrap();
            let hint = player.sleep_hint();
            assert!(hint >= config.min_sleep && hint <= config.idle_sleep, "{:?}", hint);
            let expected = (due - now).clamp(0.001, 0.025);
            assert!((hint.as_secs_f64() - expected).abs() < 1e-6, "{:?} vs {}", hint, expected);
        }

        // overdue timers still sleep for the minimum
        clock.set_time(0.03);
        assert_eq!(player.sleep_hint(), config.min_sleep);
    }
}

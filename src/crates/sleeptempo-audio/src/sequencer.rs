//! Chains a ladder of tempo steps through one scheduler
//!
//! The scheduler's completion handler only latches a flag. The sequencer
//! drains that flag after every [`Scheduler::advance`], so starting the next
//! step never happens from inside the scheduler's own call stack.

use crate::{AudioClock, AudioError, Result, Scheduler, SoundBank};
use sleeptempo_core::{Ladder, SettingsUpdate, TempoError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handler invoked once when the whole ladder has played
pub type SequenceEndHandler = Box<dyn FnMut() + Send>;

pub struct Sequencer<C: AudioClock> {
    scheduler: Scheduler<C>,
    /// Ladder used by [`Sequencer::start_configured`]
    ladder: Ladder,
    /// Snapshot of the ladder being played
    snapshot: Option<Ladder>,
    current_step_index: usize,
    overall_beat_count: u64,
    running: bool,
    step_ended: Arc<AtomicBool>,
    on_sequence_end: Option<SequenceEndHandler>,
}

impl<C: AudioClock> Sequencer<C> {
    pub fn new(scheduler: Scheduler<C>) -> Self {
        Sequencer {
            scheduler,
            ladder: Ladder::default(),
            snapshot: None,
            current_step_index: 0,
            overall_beat_count: 0,
            running: false,
            step_ended: Arc::new(AtomicBool::new(false)),
            on_sequence_end: None,
        }
    }

    pub fn scheduler(&self) -> &Scheduler<C> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<C> {
        &mut self.scheduler
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// Beats completed by earlier steps of the running ladder
    pub fn overall_beat_count(&self) -> u64 {
        self.overall_beat_count
    }

    /// The configured ladder, used on the next start
    pub fn ladder(&self) -> &Ladder {
        &self.ladder
    }

    pub fn set_on_sequence_end(&mut self, handler: impl FnMut() + Send + 'static) {
        self.on_sequence_end = Some(Box::new(handler));
    }

    pub fn attach_bank(&mut self, bank: Arc<SoundBank>) {
        self.scheduler.attach_bank(bank);
    }

    /// Forward sound and voice changes; a new ladder only applies to the next start
    pub fn update_settings(&mut self, update: &SettingsUpdate) {
        self.scheduler.update_settings(update);
        if let Some(ladder) = &update.ladder {
            self.ladder = ladder.clone();
        }
    }

    /// Play the configured ladder
    pub fn start_configured(&mut self) -> Result<()> {
        self.start(self.ladder.clone())
    }

    /// Play `ladder` from its first step
    pub fn start(&mut self, ladder: Ladder) -> Result<()> {
        if self.running {
            return Err(AudioError::AlreadyPlaying);
        }
        let Some(first) = ladder.get(0).copied() else {
            return Err(TempoError::EmptyLadder.into());
        };

        self.step_ended.store(false, Ordering::SeqCst);
        self.subscribe();
        self.running = true;
        self.current_step_index = 0;
        self.overall_beat_count = 0;

        tracing::info!(
            "Starting ladder: {} steps, {} beats, ~{:.1}s",
            ladder.len(),
            ladder.total_beats(),
            ladder.nominal_duration()
        );
        self.snapshot = Some(ladder);

        if let Err(e) = self.scheduler.start(first, 0) {
            self.reset();
            return Err(e);
        }
        Ok(())
    }

    /// Drive the scheduler, then move to the next step if the current one ended
    ///
    /// An error means a later step failed to start and the sequence stopped.
    pub fn advance(&mut self) -> Result<()> {
        self.scheduler.advance();
        if self.step_ended.swap(false, Ordering::SeqCst) {
            self.handle_step_end()?;
        }
        Ok(())
    }

    /// Earliest time the host should call [`Sequencer::advance`] again
    pub fn next_wakeup(&self) -> Option<f64> {
        self.scheduler.next_wakeup()
    }

    /// Stop the sequence without invoking the sequence-end handler.
    ///
    /// After the ladder has ended this still halts whatever is ringing.
    pub fn stop(&mut self) {
        if !self.running {
            self.scheduler.stop(false);
            return;
        }
        // mark inactive first so a completion already latched is ignored
        self.running = false;
        self.scheduler.stop(false);
        tracing::info!("Ladder stopped at step {}", self.current_step_index + 1);
        self.reset();
    }

    fn handle_step_end(&mut self) -> Result<()> {
        if !self.running {
            tracing::debug!("Ignoring step completion after stop");
            return Ok(());
        }
        let Some(ladder) = self.snapshot.as_ref() else {
            return Ok(());
        };

        if let Some(done) = ladder.get(self.current_step_index) {
            self.overall_beat_count += done.beats as u64;
        }
        self.current_step_index += 1;

        match ladder.get(self.current_step_index).copied() {
            Some(next) => {
                tracing::info!(
                    "Step {}/{}: {} (from beat {})",
                    self.current_step_index + 1,
                    ladder.len(),
                    next,
                    self.overall_beat_count + 1
                );
                if let Err(e) = self.scheduler.start(next, self.overall_beat_count) {
                    tracing::error!("Could not start step {}: {}", self.current_step_index + 1, e);
                    self.running = false;
                    self.scheduler.stop(false);
                    self.reset();
                    return Err(e);
                }
                Ok(())
            }
            None => {
                tracing::info!("Ladder finished after {} beats", self.overall_beat_count);
                self.running = false;
                self.reset();
                match self.on_sequence_end.as_mut() {
                    Some(handler) => handler(),
                    None => tracing::debug!("No sequence-end handler registered"),
                }
                Ok(())
            }
        }
    }

    fn subscribe(&mut self) {
        let latch = Arc::clone(&self.step_ended);
        self.scheduler.set_on_ended(move || latch.store(true, Ordering::SeqCst));
    }

    fn reset(&mut self) {
        self.running = false;
        self.scheduler.clear_on_ended();
        self.step_ended.store(false, Ordering::SeqCst);
        self.snapshot = None;
        self.current_step_index = 0;
        self.overall_beat_count = 0;
    }
}

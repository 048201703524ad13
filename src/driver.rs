//! Real-time host loop: sleep until the next timer, then advance the player

use sleeptempo_audio::{AudioClock, AudioError, Player};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Time left for the last click and cue to ring after the ladder ends
const RING_OUT: Duration = Duration::from_millis(500);

/// Why a play loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Finished,
    TimeLimit,
    Interrupted,
}

/// Play the configured ladder until it ends, `stop_after` elapses, or Ctrl-C
pub async fn run<C: AudioClock>(
    player: &mut Player<C>,
    stop_after: Option<Duration>,
) -> Result<PlayOutcome, AudioError> {
    player.wait_ready().await?;

    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    player.set_on_sequence_end(move || flag.store(true, Ordering::SeqCst));

    player.start()?;
    let deadline = stop_after.map(|limit| Instant::now() + limit);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = tokio::time::sleep(player.sleep_hint()) => {}
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                player.stop();
                break PlayOutcome::Interrupted;
            }
        }

        if let Err(e) = player.advance() {
            player.stop();
            return Err(e);
        }
        if finished.load(Ordering::SeqCst) {
            break PlayOutcome::Finished;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::info!("Time limit reached");
            player.stop();
            break PlayOutcome::TimeLimit;
        }
    };

    if outcome == PlayOutcome::Finished {
        tokio::time::sleep(RING_OUT).await;
    }
    Ok(outcome)
}

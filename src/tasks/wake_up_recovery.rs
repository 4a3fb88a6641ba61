//! Wake-up recovery background task

use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::time::interval;
use tracing::{info, warn};

use crate::state::AppState;

const CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Wall-clock time may run ahead of monotonic time by this much before the
/// gap counts as a suspension.
const SLEEP_THRESHOLD_MS: i64 = 2_000;

/// Background task that detects host suspension and reconciles the timer
/// immediately after wake-up.
///
/// The monotonic clock stops while the host sleeps; the wall clock does
/// not. A growing gap between the two means the host was suspended.
pub async fn wake_up_recovery_task(state: Arc<AppState>) {
    info!("Starting wake-up recovery task");

    let mut interval = interval(CHECK_INTERVAL);
    let mut last_wall = state.now();
    let mut last_mono = Instant::now();

    loop {
        interval.tick().await;

        let wall = state.now();
        let mono = Instant::now();

        if let Some(slept) = slept_millis(wall - last_wall, mono - last_mono) {
            info!("System wake-up detected after ~{}s asleep, reconciling timer", slept / 1000);
            reconcile(&state);
        }

        last_wall = wall;
        last_mono = mono;
    }
}

/// Milliseconds the host spent suspended between two observations, if any
pub fn slept_millis(wall_elapsed_ms: i64, mono_elapsed: Duration) -> Option<i64> {
    let mono_ms = i64::try_from(mono_elapsed.as_millis()).unwrap_or(i64::MAX);
    let drift = wall_elapsed_ms.saturating_sub(mono_ms);
    (drift > SLEEP_THRESHOLD_MS).then_some(drift)
}

fn reconcile(state: &AppState) {
    match state.tick() {
        Ok(timer) if timer.is_expired() => {
            if let Err(e) = state.complete_phase() {
                warn!("Failed to complete phase after wake-up: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => warn!("Failed to reconcile timer after wake-up: {}", e),
    }
}

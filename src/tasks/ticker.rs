//! Countdown scheduler background task

use std::sync::Arc;
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::state::{AppState, TimerState};

/// Background task that drives `tick` while the timer runs and performs
/// the phase transition once the countdown expires.
pub async fn ticker_task(state: Arc<AppState>) {
    info!("Starting ticker task ({}ms cadence)", state.tick_interval.as_millis());

    let mut timer_rx = state.subscribe();

    loop {
        let current = timer_rx.borrow_and_update().clone();

        if current.is_expired() {
            match state.complete_phase() {
                Ok(Some(next)) => debug!("Transitioned to {:?}, waiting for resume", next.mode),
                Ok(None) => debug!("Expiry already handled"),
                Err(e) => error!("Failed to complete phase: {}", e),
            }
        } else if current.is_active {
            run_countdown(&state, &mut timer_rx).await;
            continue;
        }

        // Paused: wait for the next state change
        if timer_rx.changed().await.is_err() {
            error!("Timer update channel closed, stopping ticker");
            break;
        }
    }
}

/// Tick on the configured cadence until the countdown expires or stops
/// running. Returns as soon as either happens.
async fn run_countdown(state: &AppState, timer_rx: &mut watch::Receiver<TimerState>) {
    debug!("Countdown running");

    let mut ticks = interval(state.tick_interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                match state.tick() {
                    Ok(timer) if timer.is_expired() => {
                        info!("Countdown reached zero");
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => error!("Failed to tick timer: {}", e),
                }
            }

            changed = timer_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                let timer = timer_rx.borrow_and_update().clone();
                if !timer.is_active || timer.is_expired() {
                    debug!("Countdown stopped (active={}, left={}s)", timer.is_active, timer.time_left);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    use crate::{
        state::{app_state::test_support::*, Mode},
        store::{MemoryStore, STATE_KEY},
    };

    const FAST: Duration = Duration::from_millis(10);

    async fn wait_for_mode(rx: &mut watch::Receiver<TimerState>, mode: Mode) -> TimerState {
        timeout(Duration::from_secs(5), async {
            loop {
                let timer = rx.borrow_and_update().clone();
                if timer.mode == mode {
                    return timer;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("timed out waiting for transition")
    }

    #[tokio::test]
    async fn test_expiry_transitions_exactly_once() {
        let h = harness_with(MemoryStore::new(), FAST);
        let mut rx = h.state.subscribe();
        h.state.toggle().unwrap();
        tokio::spawn(ticker_task(Arc::clone(&h.state)));

        h.clock.advance(1_500_000);
        let next = wait_for_mode(&mut rx, Mode::ShortBreak).await;
        assert!(!next.is_active);
        assert_eq!(next.time_left, 300);

        sleep(FAST * 5).await;
        assert_eq!(h.notifier.bodies(), vec!["Focus complete! Take a short break."]);
        assert_eq!(h.state.get_timer_state().unwrap().mode, Mode::ShortBreak);
    }

    #[tokio::test]
    async fn test_ticks_follow_the_deadline() {
        let h = harness_with(MemoryStore::new(), FAST);
        h.state.toggle().unwrap();
        tokio::spawn(ticker_task(Arc::clone(&h.state)));

        h.clock.advance(60_000);
        sleep(FAST * 5).await;
        let timer = h.state.get_timer_state().unwrap();
        assert_eq!(timer.time_left, 1440);
        assert!(timer.is_active);
    }

    #[tokio::test]
    async fn test_pause_stops_the_cadence() {
        let h = harness_with(MemoryStore::new(), FAST);
        tokio::spawn(ticker_task(Arc::clone(&h.state)));
        h.state.toggle().unwrap();
        sleep(FAST * 3).await;
        let paused = h.state.toggle().unwrap();

        h.clock.advance(10_000_000);
        sleep(FAST * 5).await;
        assert_eq!(h.state.get_timer_state().unwrap(), paused);
        assert!(h.notifier.bodies().is_empty());
    }

    #[tokio::test]
    async fn test_paused_at_zero_still_transitions() {
        let h = harness_with(MemoryStore::new(), FAST);
        let mut rx = h.state.subscribe();
        h.state.toggle().unwrap();
        h.clock.advance(1_500_000);
        let paused = h.state.toggle().unwrap();
        assert_eq!((paused.time_left, paused.is_active), (0, false));

        tokio::spawn(ticker_task(Arc::clone(&h.state)));
        let next = wait_for_mode(&mut rx, Mode::ShortBreak).await;
        assert_eq!(next.time_left, 300);
        assert!(!next.is_active);

        sleep(FAST * 5).await;
        assert_eq!(h.notifier.bodies(), vec!["Focus complete! Take a short break."]);
    }

    #[tokio::test]
    async fn test_restored_paused_zero_snapshot_is_completed_on_start() {
        let snapshot = r#"{"mode":"SHORT_BREAK","timeLeft":0,"isActive":false,"round":2,"endTime":null}"#;
        let h = harness_with(MemoryStore::with_records([(STATE_KEY, snapshot)]), FAST);
        let mut rx = h.state.subscribe();

        tokio::spawn(ticker_task(Arc::clone(&h.state)));
        let next = wait_for_mode(&mut rx, Mode::Focus).await;
        assert_eq!(next.round, 3);
        assert_eq!(next.time_left, 1500);
    }

    #[tokio::test]
    async fn test_restored_expired_snapshot_is_completed_on_start() {
        let snapshot = format!(
            r#"{{"mode":"FOCUS","timeLeft":1500,"isActive":true,"round":4,"endTime":{}}}"#,
            T - 5 * 60_000
        );
        let h = harness_with(MemoryStore::with_records([(STATE_KEY, snapshot.as_str())]), FAST);
        let mut rx = h.state.subscribe();
        assert!(h.state.get_timer_state().unwrap().is_expired());

        tokio::spawn(ticker_task(Arc::clone(&h.state)));
        let next = wait_for_mode(&mut rx, Mode::LongBreak).await;
        assert_eq!(next.round, 1);
        assert!(!next.is_active);

        sleep(FAST * 5).await;
        assert_eq!(h.notifier.bodies(), vec!["Focus complete! Time for a long break."]);
    }
}

//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Settings, SettingsPatch, TimerState};
use crate::{
    engine::{self, PhaseChange, APP_NAME},
    services::{Notifier, ThemeApplier},
    store::{Store, SETTINGS_KEY, STATE_KEY},
    utils::Clock,
};

/// External collaborators the state hands its side effects to
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub theme: Arc<dyn ThemeApplier>,
    pub clock: Arc<dyn Clock>,
}

/// Owner of the timer and its settings. Every engine operation goes through
/// here so that persistence, watchers and notifications follow each change.
pub struct AppState {
    /// Current countdown
    pub timer_state: Arc<Mutex<TimerState>>,
    /// Current settings
    pub settings: Arc<Mutex<Settings>>,
    /// Scheduler cadence while the countdown runs
    pub tick_interval: Duration,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Channel for timer updates
    pub timer_update_tx: watch::Sender<TimerState>,
    /// Keep the receiver alive to prevent channel closure
    pub _timer_update_rx: watch::Receiver<TimerState>,
    collaborators: Collaborators,
}

impl AppState {
    /// Restore settings and timer from the store, reconciling a running
    /// snapshot against the current time. `overrides` are applied on top of
    /// the persisted settings.
    pub fn load(
        collaborators: Collaborators,
        overrides: &SettingsPatch,
        port: u16,
        host: String,
        tick_interval: Duration,
    ) -> Self {
        let store = &collaborators.store;

        let mut settings = store
            .load(SETTINGS_KEY)
            .map(|raw| Settings::from_json(&raw))
            .unwrap_or_default();
        if !overrides.is_empty() {
            settings = settings.apply(overrides);
            info!("Applied settings overrides: {:?}", settings);
        }

        let snapshot = store
            .load(STATE_KEY)
            .and_then(|raw| TimerState::from_snapshot(&raw));
        let restored = snapshot.is_some();
        let timer = engine::initialize(&settings, snapshot, collaborators.clock.now_millis());

        if restored {
            info!(
                "Restored timer: mode={:?}, round={}, time_left={}s, active={}",
                timer.mode, timer.round, timer.time_left, timer.is_active
            );
        } else {
            info!("Starting fresh timer");
        }

        let (timer_update_tx, timer_update_rx) = watch::channel(timer.clone());

        let state = Self {
            timer_state: Arc::new(Mutex::new(timer.clone())),
            settings: Arc::new(Mutex::new(settings)),
            tick_interval,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            timer_update_tx,
            _timer_update_rx: timer_update_rx,
            collaborators,
        };

        state.persist_settings(&settings);
        state.persist_timer(&timer);
        state.collaborators.theme.apply(settings.dark_mode);
        state
    }

    /// Ask the notifier for alert permission
    pub fn request_notification_permission(&self) {
        self.collaborators.notifier.request_permission();
    }

    /// Current wall-clock time in epoch milliseconds
    pub fn now(&self) -> i64 {
        self.collaborators.clock.now_millis()
    }

    /// Subscribe to timer updates
    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.timer_update_tx.subscribe()
    }

    /// Apply `op` to the timer under lock. Returns `None` when the operation
    /// chose not to produce a new state.
    fn mutate_timer<F>(&self, op: F) -> Result<Option<(TimerState, Option<PhaseChange>)>, String>
    where
        F: FnOnce(&TimerState, &Settings, i64) -> Option<(TimerState, Option<PhaseChange>)>,
    {
        let settings = self.settings.lock()
            .map_err(|e| format!("Failed to lock settings: {}", e))?;
        let mut timer = self.timer_state.lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;

        let Some((next, change)) = op(&*timer, &*settings, self.now()) else {
            return Ok(None);
        };
        if next == *timer && change.is_none() {
            return Ok(None);
        }

        *timer = next.clone();
        drop(settings);

        // Publish and persist under the timer lock so snapshots land in commit order
        if let Err(e) = self.timer_update_tx.send(next.clone()) {
            warn!("Failed to send timer update: {}", e);
        }
        self.persist_timer(&next);
        drop(timer);

        if let Some(change) = change {
            info!(
                "Phase {:?} -> {:?}, round {}",
                change.from, change.to, next.round
            );
            self.collaborators.notifier.notify(APP_NAME, change.message());
        }

        Ok(Some((next, change)))
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Pause or resume the countdown
    pub fn toggle(&self) -> Result<TimerState, String> {
        self.record_action("toggle");
        let timer = match self.mutate_timer(|timer, _, now| Some((engine::toggle(timer, now), None)))? {
            Some((timer, _)) => timer,
            None => self.get_timer_state()?,
        };
        info!(
            "Timer {} with {}s left",
            if timer.is_active { "started" } else { "paused" },
            timer.time_left
        );
        Ok(timer)
    }

    /// Refresh the remaining time from the deadline
    pub fn tick(&self) -> Result<TimerState, String> {
        if let Some((timer, _)) = self.mutate_timer(|timer, _, now| Some((engine::tick(timer, now), None)))? {
            debug!("Tick: {}s left", timer.time_left);
        }
        self.get_timer_state()
    }

    /// Perform the pending transition if the countdown has expired.
    ///
    /// The expiry check happens under the same lock as the transition, so
    /// concurrent callers observe at most one transition per expiry.
    pub fn complete_phase(&self) -> Result<Option<TimerState>, String> {
        let result = self.mutate_timer(|timer, settings, _| {
            if !timer.is_expired() {
                return None;
            }
            let (next, change) = engine::advance_phase(timer, settings);
            Some((next, Some(change)))
        })?;
        Ok(result.map(|(timer, _)| timer))
    }

    /// Jump to the next phase regardless of the time left
    pub fn skip(&self) -> Result<TimerState, String> {
        self.record_action("skip");
        let skipped = self.mutate_timer(|timer, settings, _| {
            let (next, change) = engine::skip(timer, settings);
            Some((next, Some(change)))
        })?;
        match skipped {
            Some((timer, _)) => Ok(timer),
            None => self.get_timer_state(),
        }
    }

    /// Apply a partial settings update. Out-of-range values are clamped.
    /// A paused countdown is resized to the new duration, a running one is not.
    pub fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, String> {
        self.record_action("settings");

        let mut settings = self.settings.lock()
            .map_err(|e| format!("Failed to lock settings: {}", e))?;
        let previous = *settings;
        let updated = previous.apply(patch);
        if updated == previous {
            return Ok(updated);
        }
        *settings = updated;

        if updated.durations_differ(&previous) {
            let mut timer = self.timer_state.lock()
                .map_err(|e| format!("Failed to lock timer state: {}", e))?;
            let next = engine::apply_duration_change(&timer, &updated);
            if next != *timer {
                *timer = next.clone();
                debug!("Paused timer resized to {}s", next.time_left);
                if let Err(e) = self.timer_update_tx.send(next.clone()) {
                    warn!("Failed to send timer update: {}", e);
                }
                self.persist_timer(&next);
            }
        }
        self.persist_settings(&updated);
        drop(settings);

        info!("Settings updated: {:?}", updated);

        if updated.dark_mode != previous.dark_mode {
            self.collaborators.theme.apply(updated.dark_mode);
        }

        Ok(updated)
    }

    /// Get current timer state
    pub fn get_timer_state(&self) -> Result<TimerState, String> {
        self.timer_state.lock()
            .map(|state| state.clone())
            .map_err(|e| format!("Failed to lock timer state: {}", e))
    }

    /// Get current settings
    pub fn get_settings(&self) -> Result<Settings, String> {
        self.settings.lock()
            .map(|settings| *settings)
            .map_err(|e| format!("Failed to lock settings: {}", e))
    }

    /// Write the current timer snapshot to the store
    pub fn persist(&self) -> Result<(), String> {
        let timer = self.timer_state.lock()
            .map_err(|e| format!("Failed to lock timer state: {}", e))?;
        self.persist_timer(&timer);
        Ok(())
    }

    fn persist_timer(&self, timer: &TimerState) {
        match timer.to_snapshot() {
            Ok(raw) => {
                if let Err(e) = self.collaborators.store.save(STATE_KEY, &raw) {
                    warn!("Failed to persist timer snapshot: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to serialize timer snapshot: {}", e),
        }
    }

    fn persist_settings(&self, settings: &Settings) {
        match serde_json::to_string(settings) {
            Ok(raw) => {
                if let Err(e) = self.collaborators.store.save(SETTINGS_KEY, &raw) {
                    warn!("Failed to persist settings: {:#}", e);
                }
            }
            Err(e) => warn!("Failed to serialize settings: {}", e),
        }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::{
        services::{notifier::RecordingNotifier, theme::RecordingThemeApplier},
        store::MemoryStore,
        utils::clock::ManualClock,
    };

    pub const T: i64 = 1_700_000_000_000;

    pub struct Harness {
        pub state: Arc<AppState>,
        pub store: Arc<MemoryStore>,
        pub notifier: Arc<RecordingNotifier>,
        pub theme: Arc<RecordingThemeApplier>,
        pub clock: Arc<ManualClock>,
    }

    pub fn harness_with(store: MemoryStore, tick_interval: Duration) -> Harness {
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::default());
        let theme = Arc::new(RecordingThemeApplier::default());
        let clock = Arc::new(ManualClock::new(T));
        let collaborators = Collaborators {
            store: store.clone(),
            notifier: notifier.clone(),
            theme: theme.clone(),
            clock: clock.clone(),
        };
        let state = Arc::new(AppState::load(
            collaborators,
            &SettingsPatch::default(),
            0,
            "127.0.0.1".to_string(),
            tick_interval,
        ));
        Harness { state, store, notifier, theme, clock }
    }

    pub fn harness() -> Harness {
        harness_with(MemoryStore::new(), Duration::from_millis(250))
    }

    pub fn saved_timer(store: &MemoryStore) -> TimerState {
        TimerState::from_snapshot(&store.load(STATE_KEY).unwrap()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::{
        services::{notifier::RecordingNotifier, theme::RecordingThemeApplier},
        state::Mode,
        store::MemoryStore,
        utils::clock::ManualClock,
    };

    /// Store whose writes of running snapshots are slow
    struct SlowStore {
        inner: MemoryStore,
    }

    impl Store for SlowStore {
        fn load(&self, key: &str) -> Option<String> {
            self.inner.load(key)
        }

        fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
            if key == STATE_KEY && value.contains("\"isActive\":true") {
                std::thread::sleep(Duration::from_millis(300));
            }
            self.inner.save(key, value)
        }
    }

    #[test]
    fn test_fresh_start_persists_defaults() {
        let h = harness();
        let timer = h.state.get_timer_state().unwrap();
        assert_eq!(timer, TimerState::new(&Settings::default()));
        assert_eq!(saved_timer(&h.store), timer);
        assert!(h.store.load(SETTINGS_KEY).is_some());
        assert_eq!(*h.theme.0.lock().unwrap(), vec![false]);

        h.state.request_notification_permission();
        assert_eq!(
            h.notifier.permission_requests.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn test_corrupt_records_fall_back() {
        let store = MemoryStore::with_records([
            (SETTINGS_KEY, "]["),
            (STATE_KEY, r#"{"mode":"SIESTA"}"#),
        ]);
        let h = harness_with(store, Duration::from_millis(250));
        assert_eq!(h.state.get_settings().unwrap(), Settings::default());
        assert_eq!(h.state.get_timer_state().unwrap().time_left, 1500);
    }

    #[test]
    fn test_restore_running_snapshot() {
        let snapshot = format!(
            r#"{{"mode":"FOCUS","timeLeft":1500,"isActive":true,"round":2,"endTime":{}}}"#,
            T + 90_000
        );
        let store = MemoryStore::with_records([(STATE_KEY, snapshot.as_str())]);
        let h = harness_with(store, Duration::from_millis(250));
        let timer = h.state.get_timer_state().unwrap();
        assert_eq!(timer.time_left, 90);
        assert!(timer.is_active);
        assert_eq!(timer.round, 2);
    }

    #[test]
    fn test_toggle_persists_deadline() {
        let h = harness();
        let timer = h.state.toggle().unwrap();
        assert!(timer.is_active);
        assert_eq!(timer.end_time, Some(T + 1_500_000));
        assert_eq!(saved_timer(&h.store), timer);

        h.clock.advance(30_000);
        let paused = h.state.toggle().unwrap();
        assert_eq!(paused.time_left, 1470);
        assert_eq!(saved_timer(&h.store), paused);
        assert_eq!(h.state.get_last_action().0.as_deref(), Some("toggle"));
    }

    #[test]
    fn test_tick_without_change_does_not_notify_watchers() {
        let h = harness();
        h.state.toggle().unwrap();
        let mut rx = h.state.subscribe();
        rx.borrow_and_update();

        h.clock.advance(100);
        h.state.tick().unwrap();
        assert!(!rx.has_changed().unwrap());

        h.clock.advance(1000);
        let timer = h.state.tick().unwrap();
        assert_eq!(timer.time_left, 1499);
        assert!(rx.has_changed().unwrap());
    }

    #[test]
    fn test_complete_phase_happens_once() {
        let h = harness();
        h.state.toggle().unwrap();
        h.clock.advance(1_500_000);
        assert!(h.state.tick().unwrap().is_expired());

        let next = h.state.complete_phase().unwrap().unwrap();
        assert_eq!(next.mode, Mode::ShortBreak);
        assert!(!next.is_active);
        assert_eq!(h.state.complete_phase().unwrap(), None);
        assert_eq!(h.notifier.bodies(), vec!["Focus complete! Take a short break."]);
        assert_eq!(h.notifier.sent.lock().unwrap()[0].0, "Flomodoro");
    }

    #[test]
    fn test_snapshots_are_written_in_commit_order() {
        let store = Arc::new(SlowStore { inner: MemoryStore::new() });
        let clock = Arc::new(ManualClock::new(T));
        let collaborators = Collaborators {
            store: store.clone(),
            notifier: Arc::new(RecordingNotifier::default()),
            theme: Arc::new(RecordingThemeApplier::default()),
            clock: clock.clone(),
        };
        let state = Arc::new(AppState::load(
            collaborators,
            &SettingsPatch::default(),
            0,
            "127.0.0.1".to_string(),
            Duration::from_millis(250),
        ));
        state.toggle().unwrap();

        clock.advance(2_000);
        let ticking = Arc::clone(&state);
        let ticker = std::thread::spawn(move || ticking.tick().unwrap());
        std::thread::sleep(Duration::from_millis(50));
        let paused = state.toggle().unwrap();
        ticker.join().unwrap();

        assert!(!paused.is_active);
        assert_eq!(paused.time_left, 1498);
        assert_eq!(state.get_timer_state().unwrap(), paused);
        assert_eq!(saved_timer(&store.inner), paused);
    }

    #[test]
    fn test_paused_zero_completes() {
        let h = harness();
        h.state.toggle().unwrap();
        h.clock.advance(1_500_000);
        let paused = h.state.toggle().unwrap();
        assert_eq!(paused.time_left, 0);
        assert!(!paused.is_active);

        let next = h.state.complete_phase().unwrap().unwrap();
        assert_eq!(next.mode, Mode::ShortBreak);
        assert_eq!(next.time_left, 300);
        assert_eq!(h.notifier.bodies().len(), 1);
    }

    #[test]
    fn test_complete_phase_ignores_running_countdown() {
        let h = harness();
        h.state.toggle().unwrap();
        assert_eq!(h.state.complete_phase().unwrap(), None);
        assert!(h.notifier.bodies().is_empty());
    }

    #[test]
    fn test_skip_notifies_once() {
        let h = harness();
        h.state.toggle().unwrap();
        let next = h.state.skip().unwrap();
        assert_eq!(next.mode, Mode::ShortBreak);
        assert_eq!(next.time_left, 300);
        assert_eq!(h.notifier.bodies().len(), 1);
        assert_eq!(saved_timer(&h.store), next);
    }

    #[test]
    fn test_settings_change_guard() {
        let h = harness();
        let patch = SettingsPatch {
            focus_duration: Some(50),
            ..Default::default()
        };

        let running = h.state.toggle().unwrap();
        h.state.update_settings(&patch).unwrap();
        assert_eq!(h.state.get_timer_state().unwrap(), running);

        h.state.toggle().unwrap();
        let patch = SettingsPatch {
            focus_duration: Some(40),
            ..Default::default()
        };
        h.state.update_settings(&patch).unwrap();
        let timer = h.state.get_timer_state().unwrap();
        assert_eq!(timer.time_left, 2400);
        assert_eq!(saved_timer(&h.store), timer);
    }

    #[test]
    fn test_settings_update_clamps_and_applies_theme() {
        let h = harness();
        let patch = SettingsPatch {
            rounds: Some(99),
            dark_mode: Some(true),
            ..Default::default()
        };
        let settings = h.state.update_settings(&patch).unwrap();
        assert_eq!(settings.rounds, 12);
        assert_eq!(*h.theme.0.lock().unwrap(), vec![false, true]);
        assert_eq!(
            Settings::from_json(&h.store.load(SETTINGS_KEY).unwrap()),
            settings
        );
        // rounds alone never resizes the countdown
        assert_eq!(h.state.get_timer_state().unwrap().time_left, 1500);
    }
}

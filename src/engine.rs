//! Timer engine
//!
//! Pure transition functions over [`TimerState`]. Every function takes the
//! current wall-clock time as epoch milliseconds instead of reading a clock,
//! and remaining time is always derived from the absolute deadline
//! (`end_time`), never from how many ticks were delivered. Tick delivery
//! stops while the host is suspended; the deadline does not.

use crate::state::{Mode, Settings, TimerState};

/// Application name used as the notification title
pub const APP_NAME: &str = "Flomodoro";

/// A completed phase transition, returned alongside the new state so the
/// caller can emit its notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Mode,
    pub to: Mode,
}

impl PhaseChange {
    /// Notification body for this transition
    pub fn message(&self) -> &'static str {
        match (self.from, self.to) {
            (Mode::Focus, Mode::LongBreak) => "Focus complete! Time for a long break.",
            (Mode::Focus, _) => "Focus complete! Take a short break.",
            (Mode::ShortBreak, _) => "Break over! Back to focus.",
            (Mode::LongBreak, _) => "Long break over! Let's focus.",
        }
    }
}

/// Length of a phase in seconds
pub fn duration_for(mode: Mode, settings: &Settings) -> u64 {
    u64::from(mode.minutes(settings)) * 60
}

/// Whole seconds until `end_time`, rounded up. Zero or negative once the
/// deadline has passed.
pub fn seconds_until(end_time: i64, now: i64) -> i64 {
    let remaining_ms = end_time.saturating_sub(now);
    if remaining_ms > 0 {
        (remaining_ms + 999) / 1000
    } else {
        // truncation toward zero is ceil for negative values
        remaining_ms / 1000
    }
}

/// Build the starting state, reconciling a persisted snapshot against `now`.
///
/// An active snapshot whose deadline already passed comes back with
/// `time_left == 0` and still active: exactly one transition is pending and
/// it is the caller's job to perform it.
pub fn initialize(settings: &Settings, snapshot: Option<TimerState>, now: i64) -> TimerState {
    let Some(saved) = snapshot else {
        return TimerState::new(settings);
    };

    match (saved.is_active, saved.end_time) {
        (true, Some(end_time)) => {
            let left = seconds_until(end_time, now);
            TimerState {
                time_left: left.max(0) as u64,
                ..saved
            }
        }
        _ => TimerState {
            is_active: false,
            end_time: None,
            ..saved
        },
    }
}

/// Pause a running countdown or resume a paused one
pub fn toggle(state: &TimerState, now: i64) -> TimerState {
    if state.is_active {
        let remaining = match state.end_time {
            Some(end_time) => seconds_until(end_time, now).max(0) as u64,
            None => state.time_left,
        };
        TimerState {
            is_active: false,
            time_left: remaining,
            end_time: None,
            ..state.clone()
        }
    } else {
        let span = i64::try_from(state.time_left.saturating_mul(1000)).unwrap_or(i64::MAX);
        TimerState {
            is_active: true,
            end_time: Some(now.saturating_add(span)),
            ..state.clone()
        }
    }
}

/// Refresh `time_left` from the deadline.
///
/// Returns an equal state when nothing observable changed. Reaching zero
/// only records `time_left == 0`; the transition is [`advance_phase`].
pub fn tick(state: &TimerState, now: i64) -> TimerState {
    let Some(end_time) = state.end_time.filter(|_| state.is_active) else {
        return state.clone();
    };

    let left = seconds_until(end_time, now);
    if left <= 0 {
        return TimerState {
            time_left: 0,
            ..state.clone()
        };
    }

    let left = left as u64;
    if left != state.time_left {
        TimerState {
            time_left: left,
            ..state.clone()
        }
    } else {
        state.clone()
    }
}

/// Move to the next phase. The result is always paused at the full length
/// of the new phase.
pub fn advance_phase(state: &TimerState, settings: &Settings) -> (TimerState, PhaseChange) {
    let (mode, round) = match state.mode {
        Mode::Focus if state.round >= settings.rounds => (Mode::LongBreak, 1),
        Mode::Focus => (Mode::ShortBreak, state.round),
        Mode::ShortBreak => (Mode::Focus, state.round.saturating_add(1)),
        Mode::LongBreak => (Mode::Focus, 1),
    };

    let next = TimerState {
        mode,
        round,
        time_left: duration_for(mode, settings),
        is_active: false,
        end_time: None,
    };
    (next, PhaseChange { from: state.mode, to: mode })
}

/// Advance regardless of the time remaining
pub fn skip(state: &TimerState, settings: &Settings) -> (TimerState, PhaseChange) {
    advance_phase(state, settings)
}

/// Resize a paused countdown after the durations changed. A running
/// countdown is left untouched.
pub fn apply_duration_change(state: &TimerState, settings: &Settings) -> TimerState {
    if state.is_active {
        return state.clone();
    }
    TimerState {
        time_left: duration_for(state.mode, settings),
        end_time: None,
        ..state.clone()
    }
}

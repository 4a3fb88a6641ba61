//! Timer state structure and its persisted snapshot form

use serde::{Deserialize, Serialize};

use super::Settings;

/// Timer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Mode {
    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Focus => "Focus",
            Mode::ShortBreak => "Short Break",
            Mode::LongBreak => "Long Break",
        }
    }

    /// Configured length of this phase in minutes
    pub fn minutes(&self, settings: &Settings) -> u32 {
        match self {
            Mode::Focus => settings.focus_duration,
            Mode::ShortBreak => settings.short_break_duration,
            Mode::LongBreak => settings.long_break_duration,
        }
    }
}

/// Countdown state. Serializes to the snapshot format written after every
/// mutation.
///
/// While `is_active`, `end_time` (epoch milliseconds) is the deadline and
/// `time_left` is only a cached view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: Mode,
    pub time_left: u64,
    pub is_active: bool,
    pub round: u32,
    #[serde(default)]
    pub end_time: Option<i64>,
}

impl TimerState {
    /// Fresh paused focus session at round 1
    pub fn new(settings: &Settings) -> Self {
        Self {
            mode: Mode::Focus,
            time_left: u64::from(settings.focus_duration) * 60,
            is_active: false,
            round: 1,
            end_time: None,
        }
    }

    /// Whether the countdown ran out and a phase transition is pending.
    /// A paused timer at zero is still pending.
    pub fn is_expired(&self) -> bool {
        self.time_left == 0
    }

    /// Parse a persisted snapshot. Returns `None` for malformed records,
    /// including unknown mode tags.
    pub fn from_snapshot(raw: &str) -> Option<Self> {
        match serde_json::from_str::<TimerState>(raw) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!("Discarding malformed timer snapshot: {}", e);
                None
            }
        }
    }

    /// Serialize to the snapshot format
    pub fn to_snapshot(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

//! Timer settings, their bounds and partial updates

use serde::{Deserialize, Serialize};

pub const FOCUS_BOUNDS: (u32, u32) = (1, 60);
pub const SHORT_BREAK_BOUNDS: (u32, u32) = (1, 30);
pub const LONG_BREAK_BOUNDS: (u32, u32) = (1, 60);
pub const ROUNDS_BOUNDS: (u32, u32) = (1, 12);

/// User-editable timer settings. Durations are in minutes.
///
/// Missing fields in a persisted record take their default values, so
/// records written by older versions keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub focus_duration: u32,
    pub short_break_duration: u32,
    pub long_break_duration: u32,
    /// Focus sessions per long-break cycle
    pub rounds: u32,
    pub dark_mode: bool,
}

impl Settings {
    /// Clamp every numeric field into its documented bounds
    pub fn clamped(self) -> Self {
        Self {
            focus_duration: clamp(self.focus_duration, FOCUS_BOUNDS),
            short_break_duration: clamp(self.short_break_duration, SHORT_BREAK_BOUNDS),
            long_break_duration: clamp(self.long_break_duration, LONG_BREAK_BOUNDS),
            rounds: clamp(self.rounds, ROUNDS_BOUNDS),
            dark_mode: self.dark_mode,
        }
    }

    /// Apply a partial update, clamping out-of-range input
    pub fn apply(self, patch: &SettingsPatch) -> Self {
        Self {
            focus_duration: patch.focus_duration.map_or(self.focus_duration, |v| clamp_i64(v, FOCUS_BOUNDS)),
            short_break_duration: patch
                .short_break_duration
                .map_or(self.short_break_duration, |v| clamp_i64(v, SHORT_BREAK_BOUNDS)),
            long_break_duration: patch
                .long_break_duration
                .map_or(self.long_break_duration, |v| clamp_i64(v, LONG_BREAK_BOUNDS)),
            rounds: patch.rounds.map_or(self.rounds, |v| clamp_i64(v, ROUNDS_BOUNDS)),
            dark_mode: patch.dark_mode.unwrap_or(self.dark_mode),
        }
        .clamped()
    }

    /// Whether any of the three phase durations differ
    pub fn durations_differ(&self, other: &Settings) -> bool {
        self.focus_duration != other.focus_duration
            || self.short_break_duration != other.short_break_duration
            || self.long_break_duration != other.long_break_duration
    }

    /// Parse a persisted settings record, falling back to defaults on any error
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Settings>(raw) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                tracing::warn!("Discarding malformed settings record: {}", e);
                Self::default()
            }
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus_duration: 25,
            short_break_duration: 5,
            long_break_duration: 15,
            rounds: 4,
            dark_mode: false,
        }
    }
}

/// Partial settings update as sent by a settings editor.
///
/// Values are signed so that negative input is clamped instead of rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub focus_duration: Option<i64>,
    pub short_break_duration: Option<i64>,
    pub long_break_duration: Option<i64>,
    pub rounds: Option<i64>,
    pub dark_mode: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.focus_duration.is_none()
            && self.short_break_duration.is_none()
            && self.long_break_duration.is_none()
            && self.rounds.is_none()
            && self.dark_mode.is_none()
    }
}

fn clamp(value: u32, (min, max): (u32, u32)) -> u32 {
    value.clamp(min, max)
}

fn clamp_i64(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(min as i64, max as i64) as u32
}

//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::duration_for,
    state::{Mode, Settings, TimerState},
};

/// What a renderer needs to draw the timer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub mode: Mode,
    pub label: String,
    pub time_left: u64,
    /// `time_left` as `MM:SS`
    pub display: String,
    pub round: u32,
    pub rounds: u32,
    pub is_active: bool,
    /// Full length of the current phase in seconds
    pub current_duration: u64,
    /// Fraction of the phase remaining, 1.0 at start
    pub progress: f64,
}

impl StatusResponse {
    pub fn new(timer: &TimerState, settings: &Settings) -> Self {
        let current_duration = duration_for(timer.mode, settings);
        let progress = if current_duration == 0 {
            0.0
        } else {
            (timer.time_left as f64 / current_duration as f64).min(1.0)
        };

        Self {
            mode: timer.mode,
            label: timer.mode.label().to_string(),
            time_left: timer.time_left,
            display: format_clock(timer.time_left),
            round: timer.round,
            rounds: settings.rounds,
            is_active: timer.is_active,
            current_duration,
            progress,
        }
    }
}

/// API response structure for control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: StatusResponse,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: StatusResponse) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Response describing the timer after a control action
    pub fn for_timer(message: String, timer: StatusResponse) -> Self {
        let status = if timer.is_active { "active" } else { "paused" };
        Self::new(status.to_string(), message, timer)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok(uptime: String, last_action: Option<String>, last_action_time: Option<DateTime<Utc>>) -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime,
            last_action,
            last_action_time,
        }
    }
}

/// Format seconds as zero-padded `MM:SS`
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

//! State management module
//!
//! This module contains all state-related structures and their management logic.

pub mod app_state;
pub mod settings;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, Collaborators};
pub use settings::{Settings, SettingsPatch};
pub use timer_state::{Mode, TimerState};

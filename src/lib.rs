//! Flomodoro - A focus/break timer service
//!
//! This library provides a deadline-anchored countdown state machine that
//! cycles through focus sessions, short breaks and long breaks, persists its
//! state after every change and picks up where it left off after a restart
//! or a host suspension.

pub mod config;
pub mod engine;
pub mod state;
pub mod store;
pub mod api;
pub mod services;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;

//! Utility functions module
//!
//! This module contains clocks and signal handling used throughout the application.

pub mod clock;
pub mod signals;

// Re-export main items
pub use clock::{Clock, SystemClock};
pub use signals::shutdown_signal;

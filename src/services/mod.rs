//! Side-effect ports
//!
//! This module contains the collaborators invoked after a state change:
//! desktop notifications and theme application.

pub mod notifier;
pub mod theme;

// Re-export main types
pub use notifier::{DesktopNotifier, Notifier};
pub use theme::{LogThemeApplier, ThemeApplier};

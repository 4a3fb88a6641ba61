//! Dark mode side effect

use tracing::info;

/// Applies the dark-mode preference wherever the host renders
pub trait ThemeApplier: Send + Sync {
    fn apply(&self, dark_mode: bool);
}

/// Records the active theme in the service log. Renderers read `darkMode`
/// from `/settings`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogThemeApplier;

impl ThemeApplier for LogThemeApplier {
    fn apply(&self, dark_mode: bool) {
        info!("Theme set to {}", if dark_mode { "dark" } else { "light" });
    }
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingThemeApplier(pub std::sync::Mutex<Vec<bool>>);

#[cfg(test)]
impl ThemeApplier for RecordingThemeApplier {
    fn apply(&self, dark_mode: bool) {
        self.0.lock().unwrap().push(dark_mode);
    }
}

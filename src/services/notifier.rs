//! Desktop notifications and completion sound

use std::{
    path::Path,
    process::{Command, ExitStatus, Stdio},
    sync::atomic::{AtomicBool, Ordering},
};

use notify_rust::Notification;
use tracing::{debug, info, warn};

/// Fire-and-forget alert sink invoked once per phase transition
pub trait Notifier: Send + Sync {
    /// Ask for permission to raise system alerts. Called once at startup.
    fn request_permission(&self);

    /// Raise an alert. Never blocks and never fails the caller.
    fn notify(&self, title: &str, body: &str);
}

const SOUND_CANDIDATES: [(&str, &str); 3] = [
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
];

/// Notifier backed by the desktop notification daemon
#[derive(Debug)]
pub struct DesktopNotifier {
    enabled: bool,
    sound: bool,
    permitted: AtomicBool,
}

impl DesktopNotifier {
    pub fn new(enabled: bool, sound: bool) -> Self {
        Self {
            enabled,
            sound,
            permitted: AtomicBool::new(false),
        }
    }

    /// Play the first sound file that exists and wait for the player to
    /// exit. Returns `None` when no candidate file exists.
    fn play_sound(candidates: &[(&str, &str)]) -> Option<std::io::Result<ExitStatus>> {
        let (cmd, file) = candidates.iter().find(|(_, file)| Path::new(file).exists())?;
        let status = Command::new(cmd)
            .arg(file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = &status {
            debug!("Failed to play {} with {}: {}", file, cmd, e);
        }
        Some(status)
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&self) {
        if !self.enabled {
            info!("Notifications disabled");
            return;
        }

        #[cfg(all(unix, not(target_os = "macos")))]
        let permitted = match notify_rust::get_server_information() {
            Ok(server) => {
                info!("Notification server available: {} {}", server.name, server.version);
                true
            }
            Err(e) => {
                warn!("No notification server available: {}", e);
                false
            }
        };

        #[cfg(not(all(unix, not(target_os = "macos"))))]
        let permitted = true;

        self.permitted.store(permitted, Ordering::SeqCst);
    }

    fn notify(&self, title: &str, body: &str) {
        let sound = self.sound;
        let permitted = self.permitted.load(Ordering::SeqCst);
        if !permitted && !sound {
            debug!("Notification skipped, not permitted: {}", body);
            return;
        }

        let title = title.to_string();
        let body = body.to_string();
        std::thread::spawn(move || {
            if sound {
                DesktopNotifier::play_sound(&SOUND_CANDIDATES);
            }
            if !permitted {
                return;
            }
            if let Err(e) = Notification::new()
                .summary(&title)
                .body(&body)
                .appname(&title)
                .icon("alarm-clock")
                .show()
            {
                warn!("Failed to show notification: {}", e);
            }
        });
    }
}

/// Notifier that records every alert
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub permission_requests: std::sync::atomic::AtomicUsize,
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn request_permission(&self) {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
    }

    fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_notifier_never_becomes_permitted() {
        let notifier = DesktopNotifier::new(false, false);
        notifier.request_permission();
        assert!(!notifier.permitted.load(Ordering::SeqCst));
        // silently skipped
        notifier.notify("Flomodoro", "Break over! Back to focus.");
    }

    #[cfg(unix)]
    #[test]
    fn test_sound_player_is_waited_on() {
        let candidates = [("true", "/definitely/not/here.oga"), ("true", "/")];
        let status = DesktopNotifier::play_sound(&candidates).unwrap().unwrap();
        assert!(status.success());
    }

    #[test]
    fn test_no_sound_file_plays_nothing() {
        let candidates = [("true", "/definitely/not/here.oga")];
        assert!(DesktopNotifier::play_sound(&candidates).is_none());
    }
}

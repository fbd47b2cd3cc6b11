//! Host-control commands and the trait that executes them.
//!
//! # Clean Architecture note (for beginners)
//!
//! Shutting down the PC, moving the cursor or changing the volume all need
//! OS APIs.  Those calls live *outside* this crate: the HTTP handlers build a
//! [`HostCommand`] and hand it to whatever [`HostControl`] implementation the
//! binary was started with.  Tests use a mock, the default server binding only
//! logs, and a platform binding can be added without touching any handler.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors from parsing or executing a host command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostControlError {
    /// The action string named no known power or media action.
    #[error("Unsupported action.")]
    UnsupportedAction(String),
    /// The platform binding failed.  The message is for logs only and must
    /// not be sent to clients.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Power-state changes accepted by `POST /system/power`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerAction {
    Shutdown,
    Restart,
    Sleep,
    Hibernate,
    Lock,
    Logoff,
}

impl PowerAction {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerAction::Shutdown => "shutdown",
            PowerAction::Restart => "restart",
            PowerAction::Sleep => "sleep",
            PowerAction::Hibernate => "hibernate",
            PowerAction::Lock => "lock",
            PowerAction::Logoff => "logoff",
        }
    }
}

impl FromStr for PowerAction {
    type Err = HostControlError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shutdown" => Ok(PowerAction::Shutdown),
            "restart" => Ok(PowerAction::Restart),
            "sleep" => Ok(PowerAction::Sleep),
            "hibernate" => Ok(PowerAction::Hibernate),
            "lock" => Ok(PowerAction::Lock),
            "logoff" => Ok(PowerAction::Logoff),
            _ => Err(HostControlError::UnsupportedAction(s.to_string())),
        }
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl FromStr for MouseButton {
    type Err = HostControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            _ => Err(HostControlError::UnsupportedAction(s.to_string())),
        }
    }
}

/// Mouse and keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Moves the cursor to `(x, y)`, or by `(x, y)` when `absolute` is false.
    MouseMove { x: i32, y: i32, absolute: bool },
    MouseClick { button: MouseButton, clicks: u32 },
    /// Taps one key `presses` times.
    KeyPress { key: String, presses: u32 },
    /// Holds every key down in order, then releases them in reverse
    /// (e.g. `["ctrl", "alt", "delete"]`).
    KeyChord { keys: Vec<String> },
}

/// Clipboard access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardCommand {
    SetText(String),
}

/// Media keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAction {
    PlayPause,
    Next,
    Previous,
    VolumeUp,
    VolumeDown,
    VolumeMute,
}

impl MediaAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaAction::PlayPause => "play-pause",
            MediaAction::Next => "next",
            MediaAction::Previous => "previous",
            MediaAction::VolumeUp => "volume-up",
            MediaAction::VolumeDown => "volume-down",
            MediaAction::VolumeMute => "volume-mute",
        }
    }
}

impl FromStr for MediaAction {
    type Err = HostControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "play-pause" | "playpause" => Ok(MediaAction::PlayPause),
            "next" => Ok(MediaAction::Next),
            "previous" | "prev" => Ok(MediaAction::Previous),
            "volume-up" | "volumeup" => Ok(MediaAction::VolumeUp),
            "volume-down" | "volumedown" => Ok(MediaAction::VolumeDown),
            "volume-mute" | "volumemute" => Ok(MediaAction::VolumeMute),
            _ => Err(HostControlError::UnsupportedAction(s.to_string())),
        }
    }
}

/// A media key pressed `steps` times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaCommand {
    pub action: MediaAction,
    pub steps: u32,
}

/// Absolute master volume in percent.  Construction clamps to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    pub const MAX: u8 = 100;

    /// Clamps any requested level into 0..=100.
    pub fn clamped(level: i64) -> Self {
        // In range after the clamp, so the cast is lossless.
        Self(level.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// The level as a 0.0..=1.0 scalar, the form most mixer APIs take.
    pub fn as_scalar(self) -> f32 {
        f32::from(self.0) / f32::from(Self::MAX)
    }
}

/// Everything a client can ask the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    Power(PowerAction),
    Input(InputCommand),
    Clipboard(ClipboardCommand),
    /// A media key pressed one or more times.
    Media(MediaCommand),
    /// Sets the master volume to an absolute level.
    SetVolume(VolumeLevel),
}

impl HostCommand {
    /// Short family name used in log fields.
    pub fn family(&self) -> &'static str {
        match self {
            HostCommand::Power(_) => "power",
            HostCommand::Input(_) => "input",
            HostCommand::Clipboard(_) => "clipboard",
            HostCommand::Media(_) | HostCommand::SetVolume(_) => "media",
        }
    }
}

/// Executes host commands against the operating system.
///
/// Implementations must be `Send + Sync`: one instance is shared by every
/// request task.
pub trait HostControl: Send + Sync {
    /// Carries out `command`.
    ///
    /// # Errors
    ///
    /// Returns [`HostControlError::Platform`] when the OS call fails.
    fn execute(&self, command: &HostCommand) -> Result<(), HostControlError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_action_parses_every_supported_name() {
        for name in ["shutdown", "restart", "sleep", "hibernate", "lock", "logoff"] {
            let action: PowerAction = name.parse().unwrap();
            assert_eq!(action.as_str(), name);
        }
    }

    #[test]
    fn test_power_action_is_case_insensitive() {
        assert_eq!("  Shutdown ".parse::<PowerAction>(), Ok(PowerAction::Shutdown));
    }

    #[test]
    fn test_unknown_power_action_is_unsupported() {
        let err = "reboot-now".parse::<PowerAction>().unwrap_err();
        assert_eq!(err, HostControlError::UnsupportedAction("reboot-now".into()));
        assert_eq!(err.to_string(), "Unsupported action.");
    }

    #[test]
    fn test_media_action_accepts_aliases() {
        assert_eq!("volumeup".parse::<MediaAction>(), Ok(MediaAction::VolumeUp));
        assert_eq!("prev".parse::<MediaAction>(), Ok(MediaAction::Previous));
        assert_eq!("play-pause".parse::<MediaAction>(), Ok(MediaAction::PlayPause));
        assert!("rewind".parse::<MediaAction>().is_err());
    }

    #[test]
    fn test_mouse_button_parses_known_buttons_only() {
        assert_eq!("Right".parse::<MouseButton>(), Ok(MouseButton::Right));
        assert_eq!("middle".parse::<MouseButton>(), Ok(MouseButton::Middle));
        assert!("back".parse::<MouseButton>().is_err());
    }

    #[test]
    fn test_family_names() {
        assert_eq!(HostCommand::Power(PowerAction::Lock).family(), "power");
        assert_eq!(
            HostCommand::Clipboard(ClipboardCommand::SetText("x".into())).family(),
            "clipboard"
        );
    }

    #[test]
    fn test_volume_level_clamps_to_percent_range() {
        assert_eq!(VolumeLevel::clamped(-20).percent(), 0);
        assert_eq!(VolumeLevel::clamped(42).percent(), 42);
        assert_eq!(VolumeLevel::clamped(250).percent(), 100);
    }

    #[test]
    fn test_volume_level_scalar() {
        assert_eq!(VolumeLevel::clamped(100).as_scalar(), 1.0);
        assert_eq!(VolumeLevel::clamped(0).as_scalar(), 0.0);
        assert_eq!(HostCommand::SetVolume(VolumeLevel::clamped(5)).family(), "media");
    }
}

//! HostCommandUseCase: validates client requests and forwards them to the host.
//!
//! Each HTTP handler for the host-control surface (`/system/power`,
//! `/system/volume/set`, `/mouse/*`, `/keyboard/press`, `/clipboard`,
//! `/media/:action`) calls one
//! method here.  The use case:
//!
//! 1. Parses action names into typed enums (`PowerAction`, `MediaAction`,
//!    `MouseButton`), rejecting unknown names.
//! 2. Applies defaults and bounds to repeat counts.
//! 3. Hands the resulting [`HostCommand`] to the injected [`HostControl`].
//!
//! # Architecture
//!
//! The use case depends only on the `HostControl` trait; the concrete binding
//! is injected at construction time, so the whole surface is unit-testable
//! with a mock.

use std::sync::Arc;

use pcremote_core::host::{
    ClipboardCommand, InputCommand, MediaAction, MediaCommand, MouseButton, PowerAction,
    VolumeLevel,
};
use pcremote_core::{HostCommand, HostControl, HostControlError};
use thiserror::Error;
use tracing::{error, info};

/// Upper bound for clicks, presses and media steps in a single request.
pub const MAX_REPEAT: u32 = 50;

/// Error type for the host-command use case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostCommandError {
    /// Unknown power action, media action or mouse button.
    #[error("Unsupported action.")]
    Unsupported,
    /// The request was well-formed JSON but semantically unusable.
    #[error("{0}")]
    InvalidRequest(String),
    /// The host binding failed.  Details stay in the logs.
    #[error("host command failed")]
    Failed,
}

/// Clamps an optional repeat count, defaulting to 1.
fn repeat_count(field: &str, requested: Option<i64>) -> Result<u32, HostCommandError> {
    let n = requested.unwrap_or(1);
    if n < 1 || n > i64::from(MAX_REPEAT) {
        return Err(HostCommandError::InvalidRequest(format!(
            "{field} must be between 1 and {MAX_REPEAT}"
        )));
    }
    // Bounded above, so the cast is lossless.
    Ok(n as u32)
}

pub struct HostCommandUseCase {
    host: Arc<dyn HostControl>,
}

impl HostCommandUseCase {
    pub fn new(host: Arc<dyn HostControl>) -> Self {
        Self { host }
    }

    /// `POST /system/power`.  Returns the parsed action so the handler can
    /// echo it back.
    ///
    /// # Errors
    ///
    /// [`HostCommandError::Unsupported`] for an unknown action,
    /// [`HostCommandError::Failed`] if the host binding fails.
    pub fn power(&self, action: &str) -> Result<PowerAction, HostCommandError> {
        let action: PowerAction = action.parse().map_err(|_| HostCommandError::Unsupported)?;
        info!(%action, "power action requested");
        self.dispatch(HostCommand::Power(action))?;
        Ok(action)
    }

    /// `POST /mouse/move`.  Coordinates are absolute unless `absolute` is
    /// explicitly false.
    pub fn mouse_move(&self, x: i32, y: i32, absolute: Option<bool>) -> Result<(), HostCommandError> {
        self.dispatch(HostCommand::Input(InputCommand::MouseMove {
            x,
            y,
            absolute: absolute.unwrap_or(true),
        }))
    }

    /// `POST /mouse/click`.  Defaults to one left click.
    pub fn mouse_click(&self, button: Option<&str>, clicks: Option<i64>) -> Result<(), HostCommandError> {
        let button = match button {
            Some(name) => name
                .parse::<MouseButton>()
                .map_err(|_| HostCommandError::Unsupported)?,
            None => MouseButton::Left,
        };
        let clicks = repeat_count("clicks", clicks)?;
        self.dispatch(HostCommand::Input(InputCommand::MouseClick { button, clicks }))
    }

    /// `POST /keyboard/press`.
    ///
    /// A non-empty `keys` list is pressed as a chord and `presses` is
    /// ignored; otherwise `key` is tapped `presses` times.
    pub fn key_press(
        &self,
        key: Option<&str>,
        keys: Option<&[String]>,
        presses: Option<i64>,
    ) -> Result<(), HostCommandError> {
        if let Some(keys) = keys.filter(|k| !k.is_empty()) {
            if keys.iter().any(|k| k.trim().is_empty()) {
                return Err(HostCommandError::InvalidRequest("keys must not contain blanks".into()));
            }
            return self.dispatch(HostCommand::Input(InputCommand::KeyChord {
                keys: keys.iter().map(|k| k.trim().to_string()).collect(),
            }));
        }

        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| HostCommandError::InvalidRequest("key or keys is required".into()))?;
        let presses = repeat_count("presses", presses)?;
        self.dispatch(HostCommand::Input(InputCommand::KeyPress {
            key: key.to_string(),
            presses,
        }))
    }

    /// `POST /clipboard`.
    pub fn set_clipboard(&self, text: String) -> Result<(), HostCommandError> {
        self.dispatch(HostCommand::Clipboard(ClipboardCommand::SetText(text)))
    }

    /// `POST /media/:action`.
    pub fn media(&self, action: &str, steps: Option<i64>) -> Result<MediaAction, HostCommandError> {
        let action: MediaAction = action.parse().map_err(|_| HostCommandError::Unsupported)?;
        let steps = repeat_count("steps", steps)?;
        self.dispatch(HostCommand::Media(MediaCommand { action, steps }))?;
        Ok(action)
    }

    /// `POST /system/volume/set`.  Out-of-range levels are clamped, not
    /// rejected; the applied level is returned for the response.
    pub fn set_volume(&self, level: i64) -> Result<VolumeLevel, HostCommandError> {
        let level = VolumeLevel::clamped(level);
        self.dispatch(HostCommand::SetVolume(level))?;
        Ok(level)
    }

    fn dispatch(&self, command: HostCommand) -> Result<(), HostCommandError> {
        self.host.execute(&command).map_err(|e| match e {
            HostControlError::UnsupportedAction(_) => HostCommandError::Unsupported,
            HostControlError::Platform(msg) => {
                error!(family = command.family(), error = %msg, "host command failed");
                HostCommandError::Failed
            }
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

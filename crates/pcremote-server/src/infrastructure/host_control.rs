//! Default host binding: logs every command instead of touching the OS.
//!
//! # Why a logging binding? (for beginners)
//!
//! Real input injection, power management and clipboard access are different
//! on every operating system and need a desktop session to run in.  The
//! server therefore talks to the host only through the
//! [`HostControl`] trait.  This binding satisfies that trait by logging each
//! command at `info`, which is what the server runs with unless a platform
//! binding is plugged in.
//!
//! Nothing about a command outlives its log line; the binding only counts
//! how many it has handled.

use std::sync::atomic::{AtomicU64, Ordering};

use pcremote_core::host::{ClipboardCommand, InputCommand};
use pcremote_core::{HostCommand, HostControl, HostControlError};
use tracing::info;

/// A [`HostControl`] that logs commands.
#[derive(Debug, Default)]
pub struct LoggingHostControl {
    handled: AtomicU64,
}

impl LoggingHostControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of commands handled since startup.
    pub fn commands_handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }
}

impl HostControl for LoggingHostControl {
    fn execute(&self, command: &HostCommand) -> Result<(), HostControlError> {
        match command {
            HostCommand::Power(action) => info!(%action, "host: power"),
            HostCommand::Input(InputCommand::MouseMove { x, y, absolute }) => {
                info!(x, y, absolute, "host: mouse move")
            }
            HostCommand::Input(InputCommand::MouseClick { button, clicks }) => {
                info!(?button, clicks, "host: mouse click")
            }
            HostCommand::Input(InputCommand::KeyPress { key, presses }) => {
                info!(key = %key, presses, "host: key press")
            }
            HostCommand::Input(InputCommand::KeyChord { keys }) => {
                info!(keys = %keys.join("+"), "host: key chord")
            }
            // Clipboard contents can be sensitive; log the size only.
            HostCommand::Clipboard(ClipboardCommand::SetText(text)) => {
                info!(chars = text.chars().count(), "host: set clipboard")
            }
            HostCommand::Media(media) => {
                info!(action = media.action.as_str(), steps = media.steps, "host: media key")
            }
            HostCommand::SetVolume(level) => info!(level = level.percent(), "host: set volume"),
        }

        self.handled.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use std::fmt;

use serde::{Deserialize, Serialize};

/// Recorder status reported to the shell.
///
/// State transitions:
/// ```text
/// Unset → Initialized → Playing ↔ Stopped
///            ↑ (any state, via a fresh initialize)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecorderStatus {
    #[default]
    Unset,
    Initialized,
    Playing,
    Stopped,
}

impl RecorderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "Unset",
            Self::Initialized => "Initialized",
            Self::Playing => "Playing",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a device handle is ready for use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Uninitialized,
    Initialized,
}

/// Whether a device handle is currently capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Stopped,
    Recording,
}

use serde::Serialize;
use serde_json::{json, Value};

use super::state::RecorderStatus;

/// Method name under which events are pushed to the shell.
pub const PLATFORM_EVENT_METHOD: &str = "platformEvent";

/// Outbound notification pushed to the shell, fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// Status transition, emitted before the triggering call returns.
    RecorderStatus(RecorderStatus),
    /// One captured period as little-endian 16-bit signed mono PCM.
    DataPeriod(Vec<u8>),
}

impl PlatformEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecorderStatus(_) => "recorderStatus",
            Self::DataPeriod(_) => "dataPeriod",
        }
    }

    /// `{ "name": ..., "data": ... }` payload for the `platformEvent` method.
    pub fn to_value(&self) -> Value {
        match self {
            Self::RecorderStatus(status) => json!({
                "name": self.name(),
                "data": status.as_str(),
            }),
            Self::DataPeriod(pcm) => json!({
                "name": self.name(),
                "data": pcm,
            }),
        }
    }
}

/// Completion of an initialize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOutcome {
    pub success: bool,
    pub is_metering_enabled: bool,
}

impl InitializeOutcome {
    pub fn granted() -> Self {
        Self {
            success: true,
            is_metering_enabled: true,
        }
    }

    pub fn denied() -> Self {
        Self {
            success: false,
            is_metering_enabled: false,
        }
    }
}

use thiserror::Error;

/// Failures reported by the capture device adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("record start rejected: {0}")]
    RecordStartFailed(String),

    #[error("record stop rejected: {0}")]
    RecordStopFailed(String),

    #[error("device handle not opened")]
    NotOpened,

    #[error("device not configured")]
    NotConfigured,
}

/// Errors surfaced by the recorder session API.
///
/// Start and stop rejections share `FailedToRecord`. A denied permission is
/// not an error: initialize completes with `success: false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("failed to record: {0}")]
    FailedToRecord(String),

    #[error("initialize already in progress")]
    InitializeInProgress,

    #[error("timeout")]
    Timeout,

    #[error("cancelled")]
    Cancelled,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Error code carried over the method channel.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DeviceUnavailable(_) => "DeviceUnavailable",
            Self::FailedToRecord(_) => "FailedToRecord",
            Self::InitializeInProgress => "InitializeInProgress",
            Self::Timeout => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// The underlying platform message, or the display text when there is none.
    pub fn details(&self) -> String {
        match self {
            Self::DeviceUnavailable(msg) | Self::FailedToRecord(msg) | Self::Unknown(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

impl From<DeviceError> for CaptureError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::DeviceUnavailable(msg) => Self::DeviceUnavailable(msg),
            DeviceError::RecordStartFailed(msg) | DeviceError::RecordStopFailed(msg) => {
                Self::FailedToRecord(msg)
            }
            other @ (DeviceError::NotOpened | DeviceError::NotConfigured) => {
                Self::FailedToRecord(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_stop_rejections_share_a_kind() {
        let start: CaptureError = DeviceError::RecordStartFailed("busy".into()).into();
        let stop: CaptureError = DeviceError::RecordStopFailed("gone".into()).into();
        assert_eq!(start.code(), "FailedToRecord");
        assert_eq!(stop.code(), "FailedToRecord");
        assert_eq!(start.details(), "busy");
    }

    #[test]
    fn missing_handle_is_a_record_failure() {
        let err: CaptureError = DeviceError::NotOpened.into();
        assert_eq!(err, CaptureError::FailedToRecord("device handle not opened".into()));
    }

    #[test]
    fn unavailable_keeps_its_kind() {
        let err: CaptureError = DeviceError::DeviceUnavailable("no rate".into()).into();
        assert_eq!(err.code(), "DeviceUnavailable");
        assert_eq!(err.details(), "no rate");
    }
}

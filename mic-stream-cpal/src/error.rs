use thiserror::Error;

/// Failures inside the cpal backend. Crossing into the core they become
/// plain messages that the adapter classifies.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CpalError {
    #[error("no default input device")]
    NoDevice,

    #[error("input device not found: {0}")]
    DeviceNotFound(String),

    #[error("audio host error: {0}")]
    Host(String),

    #[error("failed to build input stream: {0}")]
    BuildStream(String),

    #[error("stream control failed: {0}")]
    Stream(String),

    #[error("capture device is not initialized")]
    NotInitialized,

    #[error("capture thread is gone")]
    WorkerGone,
}

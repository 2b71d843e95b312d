//! # mic-stream-core
//!
//! Platform-agnostic microphone streaming core.
//!
//! Captures 16-bit mono PCM from a platform device, delivers it to a consumer
//! one period at a time, and drives the recorder status machine behind a
//! permission gate. Platform backends (desktop via `cpal`, or the in-process
//! simulator) implement the `CaptureBackend` trait and plug into the generic
//! `RecorderSession`.
//!
//! ## Architecture
//!
//! ```text
//! mic-stream-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, PermissionProvider, RecorderDelegate
//! ├── models/       ← CaptureConfig, RecorderStatus, CaptureError, PlatformEvent, diagnostics
//! ├── processing/   ← RingBuffer, PositionTracker, CaptureBuffer, PCM codec
//! ├── session/      ← CaptureDeviceAdapter, RecorderSession, PendingInitialize
//! ├── channel/      ← RecorderChannel (method-call dispatch for an app shell)
//! └── sim/          ← SimulatedBackend, ScriptedPermission
//! ```
//!
//! ## Data flow
//!
//! ```text
//! [device I/O thread] → CaptureBuffer ─(period boundary)→ adapter scratch
//!     → LE i16 bytes → RecorderDelegate::on_data_period → shell "dataPeriod"
//! ```

pub mod channel;
pub mod models;
pub mod processing;
pub mod session;
pub mod sim;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use channel::{MethodCall, MethodResponse, RecorderChannel, METHOD_CHANNEL_NAME};
pub use models::config::{
    CaptureConfig, ChannelMask, InitializeArgs, NotificationSchedule, SampleFormat, DEFAULT_SAMPLE_RATE,
};
pub use models::diagnostics::SessionDiagnostics;
pub use models::error::{CaptureError, DeviceError};
pub use models::event::{InitializeOutcome, PlatformEvent, PLATFORM_EVENT_METHOD};
pub use models::state::{DeviceState, RecorderStatus, RecordingState};
pub use processing::capture_buffer::CaptureBuffer;
pub use processing::position::{Boundary, Notification, PositionTracker};
pub use processing::ring_buffer::RingBuffer;
pub use session::adapter::{CaptureDeviceAdapter, PeriodSink};
pub use session::pending::{InitializeResult, PendingInitialize};
pub use session::recorder::RecorderSession;
pub use traits::capture_device::{CaptureBackend, CaptureDevice, PositionListener, SampleReader};
pub use traits::permission::{PermissionCallback, PermissionProvider};
pub use traits::recorder_delegate::{EventChannelDelegate, RecorderDelegate};

use std::sync::Arc;

use crate::models::config::{CaptureConfig, ChannelMask, NotificationSchedule, SampleFormat};
use crate::models::state::{DeviceState, RecordingState};

/// Read access to the samples a device has captured but not yet handed out.
pub trait SampleReader {
    /// Read up to `buf.len()` samples. Returns the number actually read.
    fn read(&self, buf: &mut [i16]) -> usize;
}

/// Position notifications raised by a device while recording.
///
/// Both methods are called on the device's I/O thread. A device never
/// delivers two notifications concurrently.
pub trait PositionListener: Send + Sync {
    /// Called every `period_frames` captured frames.
    fn on_periodic_notification(&self, reader: &dyn SampleReader);

    /// Called every `marker_frames` captured frames (end of device buffer).
    fn on_marker_reached(&self, reader: &dyn SampleReader);
}

/// A platform microphone capture handle.
///
/// Errors are the platform's own messages; the adapter classifies them.
pub trait CaptureDevice: Send + Sync {
    fn state(&self) -> DeviceState;

    fn recording_state(&self) -> RecordingState;

    /// Install (or with `None`, remove) the position listener.
    fn set_position_listener(
        &self,
        listener: Option<Arc<dyn PositionListener>>,
        schedule: NotificationSchedule,
    );

    fn start_recording(&self) -> Result<(), String>;

    fn stop(&self) -> Result<(), String>;

    /// Free the handle. Afterwards `state()` is `Uninitialized`.
    fn release(&self);
}

/// Factory for capture handles on one platform.
///
/// Implemented by:
/// - `SimulatedBackend` (in-process, this crate)
/// - `CpalBackend` (desktop, `mic-stream-cpal`)
pub trait CaptureBackend: Send + Sync {
    type Device: CaptureDevice + 'static;

    /// Smallest viable buffer, in frames, for the given stream shape.
    /// `None` when the platform cannot capture at this configuration.
    fn min_buffer_frames(
        &self,
        sample_rate: u32,
        channels: ChannelMask,
        format: SampleFormat,
    ) -> Option<usize>;

    /// Create a handle bound to the microphone source.
    fn open_device(&self, config: &CaptureConfig) -> Result<Self::Device, String>;
}

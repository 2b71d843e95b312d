use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{CaptureConfig, ChannelMask, NotificationSchedule, SampleFormat};
use crate::models::error::DeviceError;
use crate::models::state::{DeviceState, RecordingState};
use crate::traits::capture_device::{CaptureBackend, CaptureDevice, PositionListener, SampleReader};

/// Receiver of the samples read at each period boundary.
///
/// Called on the device I/O thread with no adapter lock held, so an
/// implementation may call back into the session.
pub trait PeriodSink: Send + Sync {
    fn on_period(&self, samples: &[i16]);

    /// A marker notification drained `drained` samples without delivering them.
    fn on_marker_drain(&self, drained: usize);
}

/// Listener registered on each opened device.
struct ScratchListener {
    scratch: Arc<Mutex<Vec<i16>>>,
    buffer_frames: usize,
    sink: Arc<dyn PeriodSink>,
    armed: Arc<AtomicBool>,
}

impl PositionListener for ScratchListener {
    fn on_periodic_notification(&self, reader: &dyn SampleReader) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }
        let period = {
            let mut scratch = self.scratch.lock();
            let read = reader.read(&mut scratch[..]);
            scratch[..read].to_vec()
        };
        if !period.is_empty() {
            self.sink.on_period(&period);
        }
    }

    fn on_marker_reached(&self, reader: &dyn SampleReader) {
        if !self.armed.load(Ordering::Acquire) {
            return;
        }
        let drained = {
            let mut scratch = self.scratch.lock();
            let chunk = scratch.len();
            let mut drained = 0;
            while chunk > 0 && drained < self.buffer_frames {
                let want = chunk.min(self.buffer_frames - drained);
                let read = reader.read(&mut scratch[..want]);
                drained += read;
                if read < want {
                    break;
                }
            }
            drained
        };
        self.sink.on_marker_drain(drained);
    }
}

/// Owns one platform capture handle, its configuration and scratch buffer.
///
/// All transitions are idempotent against the device's own state, so a
/// caller may issue start/stop/release without tracking them.
pub struct CaptureDeviceAdapter<B: CaptureBackend> {
    backend: B,
    config: Option<CaptureConfig>,
    device: Option<B::Device>,
    scratch: Arc<Mutex<Vec<i16>>>,
    armed: Arc<AtomicBool>,
    sink: Option<Arc<dyn PeriodSink>>,
}

impl<B: CaptureBackend> CaptureDeviceAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            config: None,
            device: None,
            scratch: Arc::new(Mutex::new(Vec::new())),
            armed: Arc::new(AtomicBool::new(false)),
            sink: None,
        }
    }

    /// Where period data goes for devices opened from now on.
    pub fn set_sink(&mut self, sink: Arc<dyn PeriodSink>) {
        self.sink = Some(sink);
    }

    /// Derive and validate the configuration for `sample_rate` without
    /// applying it.
    pub fn negotiate(&self, sample_rate: u32) -> Result<CaptureConfig, DeviceError> {
        let period_frames = self
            .backend
            .min_buffer_frames(sample_rate, ChannelMask::Mono, SampleFormat::Pcm16)
            .filter(|frames| *frames > 0)
            .ok_or_else(|| {
                DeviceError::DeviceUnavailable(format!(
                    "no capture configuration for {} Hz mono 16-bit PCM",
                    sample_rate
                ))
            })?;

        let config = CaptureConfig::from_period(sample_rate, period_frames);
        config.validate().map_err(DeviceError::DeviceUnavailable)?;
        Ok(config)
    }

    /// Adopt `config` and size the scratch buffer to one period. Any open
    /// handle is released first, since it was built for the old shape.
    pub fn configure(&mut self, config: CaptureConfig) {
        if self.config.as_ref() != Some(&config) {
            self.release();
        }
        *self.scratch.lock() = vec![0; config.period_frames];
        log::debug!(
            "capture configured: {} Hz, period {} frames ({} bytes, {:?}), buffer {} frames",
            config.sample_rate,
            config.period_frames,
            config.period_bytes(),
            config.period_duration(),
            config.buffer_frames
        );
        self.config = Some(config);
    }

    /// Return the ready handle, creating one if none is ready.
    pub fn open(&mut self, config: &CaptureConfig) -> Result<&B::Device, DeviceError> {
        let ready = self
            .device
            .as_ref()
            .is_some_and(|d| d.state() == DeviceState::Initialized);

        if !ready {
            self.release();

            let device = self
                .backend
                .open_device(config)
                .map_err(DeviceError::DeviceUnavailable)?;

            if let Some(sink) = &self.sink {
                // Fresh flag: listeners of earlier handles stay disarmed.
                self.armed = Arc::new(AtomicBool::new(true));
                let listener: Arc<dyn PositionListener> = Arc::new(ScratchListener {
                    scratch: Arc::clone(&self.scratch),
                    buffer_frames: config.buffer_frames,
                    sink: Arc::clone(sink),
                    armed: Arc::clone(&self.armed),
                });
                device.set_position_listener(Some(listener), config.schedule());
            }
            self.device = Some(device);
        }

        self.device.as_ref().ok_or(DeviceError::NotOpened)
    }

    pub fn start(&mut self) -> Result<(), DeviceError> {
        let device = self.device.as_ref().ok_or(DeviceError::NotOpened)?;
        if device.recording_state() == RecordingState::Recording {
            return Ok(());
        }
        device
            .start_recording()
            .map_err(DeviceError::RecordStartFailed)
    }

    pub fn stop(&mut self) -> Result<(), DeviceError> {
        let device = self.device.as_ref().ok_or(DeviceError::NotOpened)?;
        if device.recording_state() == RecordingState::Stopped {
            return Ok(());
        }
        device.stop().map_err(DeviceError::RecordStopFailed)
    }

    /// Unregister callbacks, stop if recording, free the handle. No-op when
    /// nothing is open.
    pub fn release(&mut self) {
        self.armed.store(false, Ordering::Release);
        let Some(device) = self.device.take() else {
            return;
        };
        device.set_position_listener(None, NotificationSchedule::default());
        if device.recording_state() == RecordingState::Recording {
            if let Err(e) = device.stop() {
                log::warn!("stop during release failed: {}", e);
            }
        }
        device.release();
    }

    /// Release the handle and forget the configuration.
    pub fn teardown(&mut self) {
        self.release();
        self.config = None;
        self.scratch.lock().clear();
    }

    pub fn is_recording(&self) -> bool {
        self.device
            .as_ref()
            .is_some_and(|d| d.recording_state() == RecordingState::Recording)
    }

    pub fn config(&self) -> Option<&CaptureConfig> {
        self.config.as_ref()
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }
}

impl<B: CaptureBackend> Drop for CaptureDeviceAdapter<B> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::position::{Boundary, Notification};
    use crate::sim::SimulatedBackend;

    #[derive(Default)]
    struct CollectSink {
        periods: Mutex<Vec<Vec<i16>>>,
        drained: Mutex<Vec<usize>>,
    }

    impl PeriodSink for CollectSink {
        fn on_period(&self, samples: &[i16]) {
            self.periods.lock().push(samples.to_vec());
        }

        fn on_marker_drain(&self, drained: usize) {
            self.drained.lock().push(drained);
        }
    }

    fn adapter(period: usize) -> (CaptureDeviceAdapter<SimulatedBackend>, SimulatedBackend, Arc<CollectSink>) {
        let backend = SimulatedBackend::new(period);
        let sink = Arc::new(CollectSink::default());
        let mut adapter = CaptureDeviceAdapter::new(backend.clone());
        adapter.set_sink(sink.clone());
        (adapter, backend, sink)
    }

    fn configure_at(
        adapter: &mut CaptureDeviceAdapter<SimulatedBackend>,
        sample_rate: u32,
    ) -> CaptureConfig {
        let config = adapter.negotiate(sample_rate).unwrap();
        adapter.configure(config.clone());
        config
    }

    #[test]
    fn configure_derives_buffer_sizes() {
        let (mut adapter, _, _) = adapter(320);
        let config = configure_at(&mut adapter, 16000);
        assert_eq!(config.period_frames, 320);
        assert_eq!(config.buffer_frames, 640);
        assert_eq!(adapter.config(), Some(&config));
    }

    #[test]
    fn configure_rejects_unsupported_rate() {
        let backend = SimulatedBackend::new(320).without_rate(8000);
        let mut adapter = CaptureDeviceAdapter::new(backend);
        assert!(matches!(
            adapter.negotiate(8000),
            Err(DeviceError::DeviceUnavailable(_))
        ));
        assert!(adapter.config().is_none());
    }

    #[test]
    fn open_reuses_ready_handle() {
        let (mut adapter, backend, _) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();
        adapter.open(&config).unwrap();
        assert_eq!(backend.opened_count(), 1);

        adapter.release();
        adapter.release();
        adapter.open(&config).unwrap();
        assert_eq!(backend.opened_count(), 2);
    }

    #[test]
    fn open_failure_is_device_unavailable() {
        let (mut adapter, backend, _) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        backend.fail_next_open("no microphone");
        assert_eq!(
            adapter.open(&config).err(),
            Some(DeviceError::DeviceUnavailable("no microphone".into()))
        );
        assert!(adapter.device().is_none());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut adapter, backend, _) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();

        adapter.start().unwrap();
        adapter.start().unwrap();
        assert!(adapter.is_recording());
        assert_eq!(backend.start_calls(), 1);

        adapter.stop().unwrap();
        adapter.stop().unwrap();
        assert!(!adapter.is_recording());
        assert_eq!(backend.stop_calls(), 1);
    }

    #[test]
    fn start_without_handle_fails() {
        let (mut adapter, _, _) = adapter(4);
        assert_eq!(adapter.start(), Err(DeviceError::NotOpened));
        assert_eq!(adapter.stop(), Err(DeviceError::NotOpened));
    }

    #[test]
    fn device_rejections_are_classified() {
        let (mut adapter, backend, _) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();

        backend.fail_start(Some("hardware busy"));
        assert_eq!(
            adapter.start(),
            Err(DeviceError::RecordStartFailed("hardware busy".into()))
        );

        backend.fail_start(None);
        adapter.start().unwrap();
        backend.fail_stop(Some("device gone"));
        assert_eq!(
            adapter.stop(),
            Err(DeviceError::RecordStopFailed("device gone".into()))
        );
    }

    #[test]
    fn periods_reach_the_sink() {
        let (mut adapter, backend, sink) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();
        adapter.start().unwrap();

        let samples: Vec<i16> = (1..=9).collect();
        backend.feed(&samples);

        assert_eq!(*sink.periods.lock(), vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
        // Marker at frame 8 follows the second period with nothing left.
        assert_eq!(*sink.drained.lock(), vec![0]);
    }

    #[test]
    fn negotiate_leaves_current_config() {
        let backend = SimulatedBackend::new(4).with_rate(44100, 8);
        let mut adapter = CaptureDeviceAdapter::new(backend);
        let current = configure_at(&mut adapter, 16000);

        let staged = adapter.negotiate(44100).unwrap();
        assert_eq!(staged.period_frames, 8);
        assert_eq!(adapter.config(), Some(&current));
    }

    #[test]
    fn new_shape_releases_open_handle() {
        let (mut adapter, backend, _) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();
        let first = backend.current_device().unwrap();

        configure_at(&mut adapter, 16000);
        assert!(!first.is_released());

        configure_at(&mut adapter, 48000);
        assert!(first.is_released());
        assert!(adapter.device().is_none());
    }

    #[test]
    fn empty_period_is_not_delivered() {
        let (mut adapter, backend, sink) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();
        let device = backend.current_device().unwrap();

        device.buffer().deliver(Boundary {
            kind: Notification::Periodic,
            position: 4,
        });

        assert!(sink.periods.lock().is_empty());
    }

    #[test]
    fn released_listener_is_silenced() {
        let (mut adapter, backend, sink) = adapter(4);
        let config = configure_at(&mut adapter, 16000);
        adapter.open(&config).unwrap();
        adapter.start().unwrap();
        let device = backend.current_device().unwrap();

        adapter.release();
        // The simulated device refuses feeds once released; push directly.
        device.buffer().push_and_deliver(&[1, 2, 3, 4]);

        assert!(sink.periods.lock().is_empty());
        assert!(device.is_released());
    }
}

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{CaptureConfig, ChannelMask, NotificationSchedule, SampleFormat};
use crate::models::state::{DeviceState, RecordingState};
use crate::processing::capture_buffer::CaptureBuffer;
use crate::traits::capture_device::{CaptureBackend, CaptureDevice, PositionListener};

#[derive(Default)]
struct Faults {
    next_open: Option<String>,
    start: Option<String>,
    stop: Option<String>,
}

struct BackendInner {
    default_period: usize,
    rates: HashMap<u32, Option<usize>>,
    faults: Mutex<Faults>,
    devices: Mutex<Vec<SimulatedDevice>>,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
}

/// Capture backend whose "microphone" is fed by the caller.
#[derive(Clone)]
pub struct SimulatedBackend {
    inner: Arc<BackendInner>,
}

impl SimulatedBackend {
    /// Every sample rate reports `period_frames` as its minimum buffer.
    pub fn new(period_frames: usize) -> Self {
        Self::build(period_frames, HashMap::new())
    }

    fn build(default_period: usize, rates: HashMap<u32, Option<usize>>) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                default_period,
                rates,
                faults: Mutex::new(Faults::default()),
                devices: Mutex::new(Vec::new()),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
            }),
        }
    }

    fn with_rate_entry(self, sample_rate: u32, entry: Option<usize>) -> Self {
        let mut rates = self.inner.rates.clone();
        rates.insert(sample_rate, entry);
        Self::build(self.inner.default_period, rates)
    }

    /// Override the minimum buffer reported for one rate.
    pub fn with_rate(self, sample_rate: u32, period_frames: usize) -> Self {
        self.with_rate_entry(sample_rate, Some(period_frames))
    }

    /// Report no valid configuration for one rate.
    pub fn without_rate(self, sample_rate: u32) -> Self {
        self.with_rate_entry(sample_rate, None)
    }

    pub fn fail_next_open(&self, message: &str) {
        self.inner.faults.lock().next_open = Some(message.to_string());
    }

    /// Make every start rejected with `message`, or accepted again with `None`.
    pub fn fail_start(&self, message: Option<&str>) {
        self.inner.faults.lock().start = message.map(str::to_string);
    }

    pub fn fail_stop(&self, message: Option<&str>) {
        self.inner.faults.lock().stop = message.map(str::to_string);
    }

    /// The most recently opened handle.
    pub fn current_device(&self) -> Option<SimulatedDevice> {
        self.inner.devices.lock().last().cloned()
    }

    pub fn opened_count(&self) -> usize {
        self.inner.devices.lock().len()
    }

    pub fn start_calls(&self) -> usize {
        self.inner.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }

    /// Capture `samples` on the current device. Returns `false` when no
    /// device is recording, in which case the samples are lost.
    pub fn feed(&self, samples: &[i16]) -> bool {
        match self.current_device() {
            Some(device) => device.feed(samples),
            None => false,
        }
    }
}

impl CaptureBackend for SimulatedBackend {
    type Device = SimulatedDevice;

    fn min_buffer_frames(
        &self,
        sample_rate: u32,
        _channels: ChannelMask,
        _format: SampleFormat,
    ) -> Option<usize> {
        if sample_rate == 0 {
            return None;
        }
        match self.inner.rates.get(&sample_rate) {
            Some(entry) => *entry,
            None => Some(self.inner.default_period),
        }
    }

    fn open_device(&self, config: &CaptureConfig) -> Result<SimulatedDevice, String> {
        if let Some(message) = self.inner.faults.lock().next_open.take() {
            return Err(message);
        }
        let device = SimulatedDevice {
            inner: Arc::new(DeviceInner {
                buffer: CaptureBuffer::new(config.buffer_frames),
                state: Mutex::new((DeviceState::Initialized, RecordingState::Stopped)),
                backend: Arc::clone(&self.inner),
            }),
        };
        self.inner.devices.lock().push(device.clone());
        Ok(device)
    }
}

struct DeviceInner {
    buffer: CaptureBuffer,
    state: Mutex<(DeviceState, RecordingState)>,
    backend: Arc<BackendInner>,
}

/// Handle produced by [`SimulatedBackend`].
#[derive(Clone)]
pub struct SimulatedDevice {
    inner: Arc<DeviceInner>,
}

impl SimulatedDevice {
    /// Capture samples, delivering due notifications on the calling thread.
    pub fn feed(&self, samples: &[i16]) -> bool {
        if self.recording_state() != RecordingState::Recording {
            return false;
        }
        self.inner.buffer.push_and_deliver(samples);
        true
    }

    pub fn buffer(&self) -> &CaptureBuffer {
        &self.inner.buffer
    }

    pub fn is_released(&self) -> bool {
        self.state() == DeviceState::Uninitialized
    }
}

impl CaptureDevice for SimulatedDevice {
    fn state(&self) -> DeviceState {
        self.inner.state.lock().0
    }

    fn recording_state(&self) -> RecordingState {
        self.inner.state.lock().1
    }

    fn set_position_listener(
        &self,
        listener: Option<Arc<dyn PositionListener>>,
        schedule: NotificationSchedule,
    ) {
        self.inner.buffer.set_listener(listener, schedule);
    }

    fn start_recording(&self) -> Result<(), String> {
        let mut state = self.inner.state.lock();
        if state.0 == DeviceState::Uninitialized {
            return Err("startRecording() called on an uninitialized device".into());
        }
        if let Some(message) = self.inner.backend.faults.lock().start.clone() {
            return Err(message);
        }
        self.inner.backend.start_calls.fetch_add(1, Ordering::SeqCst);
        state.1 = RecordingState::Recording;
        Ok(())
    }

    fn stop(&self) -> Result<(), String> {
        let mut state = self.inner.state.lock();
        if state.0 == DeviceState::Uninitialized {
            return Err("stop() called on an uninitialized device".into());
        }
        if let Some(message) = self.inner.backend.faults.lock().stop.clone() {
            return Err(message);
        }
        self.inner.backend.stop_calls.fetch_add(1, Ordering::SeqCst);
        state.1 = RecordingState::Stopped;
        Ok(())
    }

    fn release(&self) {
        *self.inner.state.lock() = (DeviceState::Uninitialized, RecordingState::Stopped);
        self.inner.buffer.clear();
    }
}

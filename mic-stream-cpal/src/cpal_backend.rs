//! Microphone capture through cpal.
//!
//! A `cpal::Stream` may not leave the thread that built it, so each
//! [`CpalCaptureDevice`] owns a capture thread that builds the stream and
//! serves start/stop/release commands. The input callback writes into the
//! device's [`CaptureBuffer`]; boundary notifications are handed to a second
//! thread which runs the listener, keeping the audio callback short.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, StreamTrait};
use parking_lot::Mutex;

use mic_stream_core::models::config::{CaptureConfig, ChannelMask, NotificationSchedule, SampleFormat};
use mic_stream_core::models::state::{DeviceState, RecordingState};
use mic_stream_core::processing::capture_buffer::CaptureBuffer;
use mic_stream_core::processing::position::Boundary;
use mic_stream_core::traits::capture_device::{CaptureBackend, CaptureDevice, PositionListener};

use crate::buffer_size::{fixed_buffer_frames, ring_capacity, select_period_frames};
use crate::device_enumerator::{input_configs, DeviceEnumerator};
use crate::error::CpalError;

/// Opens capture handles on the default host.
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    /// Capture from the default input device.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture from the input device with this name.
    pub fn with_device_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

impl CaptureBackend for CpalBackend {
    type Device = CpalCaptureDevice;

    fn min_buffer_frames(
        &self,
        sample_rate: u32,
        channels: ChannelMask,
        format: SampleFormat,
    ) -> Option<usize> {
        if channels.channel_count() != 1 || format.bytes_per_sample() != 2 {
            return None;
        }
        let device = match DeviceEnumerator::new().find_input_device(self.device_name.as_deref()) {
            Ok(device) => device,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };
        select_period_frames(&input_configs(&device), sample_rate)
    }

    fn open_device(&self, config: &CaptureConfig) -> Result<CpalCaptureDevice, String> {
        CpalCaptureDevice::spawn(self.device_name.clone(), config).map_err(|e| e.to_string())
    }
}

type Reply = mpsc::SyncSender<Result<(), CpalError>>;

enum Command {
    Start(Reply),
    Pause(Reply),
    Release,
}

struct DeviceStatus {
    device: DeviceState,
    recording: RecordingState,
}

/// One open input stream.
pub struct CpalCaptureDevice {
    buffer: Arc<CaptureBuffer>,
    status: Mutex<DeviceStatus>,
    commands: Mutex<Option<mpsc::Sender<Command>>>,
    capture: Mutex<Option<JoinHandle<()>>>,
}

impl CpalCaptureDevice {
    fn spawn(device_name: Option<String>, config: &CaptureConfig) -> Result<Self, CpalError> {
        let buffer = Arc::new(CaptureBuffer::new(ring_capacity(
            config.buffer_frames,
            config.sample_rate,
        )));
        let capture_config = config.clone();

        let (command_tx, command_rx) = mpsc::channel::<Command>();
        let (notify_tx, notify_rx) = mpsc::channel::<Boundary>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), CpalError>>(1);

        let capture_buffer = Arc::clone(&buffer);
        let capture = thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                capture_thread(
                    device_name,
                    capture_config,
                    capture_buffer,
                    notify_tx,
                    command_rx,
                    ready_tx,
                )
            })
            .map_err(|e| CpalError::Host(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = capture.join();
                return Err(e);
            }
            Err(_) => {
                let _ = capture.join();
                return Err(CpalError::WorkerGone);
            }
        }

        // Detached: ends once the stream, and with it the callback's sender,
        // is dropped. Release must not wait on a listener call in flight.
        let notify_buffer = Arc::clone(&buffer);
        let notifier = thread::Builder::new()
            .name("mic-notify".into())
            .spawn(move || {
                for boundary in notify_rx {
                    notify_buffer.deliver(boundary);
                }
            });
        if let Err(e) = notifier {
            let _ = command_tx.send(Command::Release);
            let _ = capture.join();
            return Err(CpalError::Host(e.to_string()));
        }

        log::debug!(
            "cpal input stream ready: {} Hz, buffer {} frames",
            config.sample_rate,
            config.buffer_frames
        );

        Ok(Self {
            buffer,
            status: Mutex::new(DeviceStatus {
                device: DeviceState::Initialized,
                recording: RecordingState::Stopped,
            }),
            commands: Mutex::new(Some(command_tx)),
            capture: Mutex::new(Some(capture)),
        })
    }

    fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), CpalError> {
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        {
            let commands = self.commands.lock();
            let sender = commands.as_ref().ok_or(CpalError::NotInitialized)?;
            sender
                .send(command(reply_tx))
                .map_err(|_| CpalError::WorkerGone)?;
        }
        reply_rx.recv().map_err(|_| CpalError::WorkerGone)?
    }
}

fn capture_thread(
    device_name: Option<String>,
    config: CaptureConfig,
    buffer: Arc<CaptureBuffer>,
    notify: mpsc::Sender<Boundary>,
    commands: mpsc::Receiver<Command>,
    ready: mpsc::SyncSender<Result<(), CpalError>>,
) {
    let stream = match build_stream(device_name.as_deref(), &config, buffer, notify) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    for command in commands {
        match command {
            Command::Start(reply) => {
                let _ = reply.send(stream.play().map_err(|e| CpalError::Stream(e.to_string())));
            }
            Command::Pause(reply) => {
                let _ = reply.send(stream.pause().map_err(|e| CpalError::Stream(e.to_string())));
            }
            Command::Release => break,
        }
    }
    drop(stream);
    log::debug!("cpal input stream closed");
}

fn build_stream(
    device_name: Option<&str>,
    config: &CaptureConfig,
    buffer: Arc<CaptureBuffer>,
    notify: mpsc::Sender<Boundary>,
) -> Result<cpal::Stream, CpalError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let buffer_size = fixed_buffer_frames(&input_configs(&device), config.sample_rate, config.period_frames)
        .map_or(cpal::BufferSize::Default, cpal::BufferSize::Fixed);
    log::debug!("cpal input buffer: {:?}", buffer_size);

    let stream_config = cpal::StreamConfig {
        channels: config.channel_mask.channel_count(),
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size,
    };
    device
        .build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                buffer.push(data, |boundary| {
                    // Receiver outlives the stream except during teardown.
                    let _ = notify.send(boundary);
                });
            },
            |err| log::error!("cpal input stream error: {}", err),
            None,
        )
        .map_err(|e| CpalError::BuildStream(e.to_string()))
}

impl CaptureDevice for CpalCaptureDevice {
    fn state(&self) -> DeviceState {
        self.status.lock().device
    }

    fn recording_state(&self) -> RecordingState {
        self.status.lock().recording
    }

    fn set_position_listener(
        &self,
        listener: Option<Arc<dyn PositionListener>>,
        schedule: NotificationSchedule,
    ) {
        self.buffer.set_listener(listener, schedule);
    }

    fn start_recording(&self) -> Result<(), String> {
        if self.state() != DeviceState::Initialized {
            return Err(CpalError::NotInitialized.to_string());
        }
        self.request(Command::Start).map_err(|e| e.to_string())?;
        self.status.lock().recording = RecordingState::Recording;
        Ok(())
    }

    fn stop(&self) -> Result<(), String> {
        if self.state() != DeviceState::Initialized {
            return Err(CpalError::NotInitialized.to_string());
        }
        self.request(Command::Pause).map_err(|e| e.to_string())?;
        self.status.lock().recording = RecordingState::Stopped;
        Ok(())
    }

    fn release(&self) {
        {
            let mut status = self.status.lock();
            status.device = DeviceState::Uninitialized;
            status.recording = RecordingState::Stopped;
        }
        if let Some(sender) = self.commands.lock().take() {
            let _ = sender.send(Command::Release);
        }
        if let Some(handle) = self.capture.lock().take() {
            if handle.join().is_err() {
                log::warn!("cpal capture thread panicked");
            }
        }
        let dropped = self.buffer.dropped();
        if dropped > 0 {
            log::warn!("cpal capture overwrote {} unread samples", dropped);
        }
        self.buffer.clear();
    }
}

impl Drop for CpalCaptureDevice {
    fn drop(&mut self) {
        self.release();
    }
}

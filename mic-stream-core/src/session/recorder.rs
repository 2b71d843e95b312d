use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::models::config::{CaptureConfig, InitializeArgs, DEFAULT_SAMPLE_RATE};
use crate::models::diagnostics::SessionDiagnostics;
use crate::models::error::{CaptureError, DeviceError};
use crate::models::event::InitializeOutcome;
use crate::models::state::RecorderStatus;
use crate::processing::pcm;
use crate::session::adapter::{CaptureDeviceAdapter, PeriodSink};
use crate::session::pending::{InitializeResult, PendingInitialize};
use crate::traits::capture_device::CaptureBackend;
use crate::traits::permission::PermissionProvider;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Outbound side of a session, shared with the device listener.
struct EventRelay {
    delegate: RwLock<Option<Arc<dyn RecorderDelegate>>>,
    diagnostics: Mutex<SessionDiagnostics>,
}

impl EventRelay {
    fn new() -> Self {
        Self {
            delegate: RwLock::new(None),
            diagnostics: Mutex::new(SessionDiagnostics::default()),
        }
    }

    fn delegate(&self) -> Option<Arc<dyn RecorderDelegate>> {
        self.delegate.read().clone()
    }

    fn emit_status(&self, status: RecorderStatus) {
        match self.delegate() {
            Some(delegate) => delegate.on_status_changed(status),
            None => self.diagnostics.lock().events_dropped += 1,
        }
    }
}

impl PeriodSink for EventRelay {
    fn on_period(&self, samples: &[i16]) {
        let bytes = pcm::encode_le_i16(samples);
        let delegate = self.delegate();
        {
            let mut d = self.diagnostics.lock();
            d.periods_delivered += 1;
            d.samples_delivered += samples.len() as u64;
            d.last_period_at = Some(chrono::Utc::now());
            if delegate.is_some() {
                d.bytes_delivered += bytes.len() as u64;
            } else {
                d.events_dropped += 1;
            }
        }
        if let Some(delegate) = delegate {
            delegate.on_data_period(&bytes);
        }
    }

    fn on_marker_drain(&self, drained: usize) {
        let mut d = self.diagnostics.lock();
        d.marker_drains += 1;
        d.samples_drained += drained as u64;
    }
}

struct SessionState {
    status: RecorderStatus,
    sample_rate: u32,
    pending: Option<PendingInitialize>,
    /// Configuration of the pending request, applied once permission is granted.
    staged: Option<CaptureConfig>,
}

struct SessionShared<B: CaptureBackend, P: PermissionProvider> {
    id: Uuid,
    adapter: Mutex<CaptureDeviceAdapter<B>>,
    permission: P,
    permission_granted: AtomicBool,
    debug_logging: AtomicBool,
    state: Mutex<SessionState>,
    events: Arc<EventRelay>,
}

impl<B, P> SessionShared<B, P>
where
    B: CaptureBackend + 'static,
    P: PermissionProvider + 'static,
{
    fn debug_log(&self, args: fmt::Arguments<'_>) {
        if self.debug_logging.load(Ordering::Relaxed) {
            log::debug!("[recorder {}] {}", self.id, args);
        }
    }

    fn set_status(&self, status: RecorderStatus) {
        let previous = std::mem::replace(&mut self.state.lock().status, status);
        log::info!("[recorder {}] {} -> {}", self.id, previous, status);
        self.events.emit_status(status);
    }

    /// Finish the initialize identified by `id` once permission is known.
    fn complete_initialize(&self, id: Uuid, granted: bool) {
        let pending = {
            let mut state = self.state.lock();
            if state.pending.as_ref().is_some_and(|p| p.id() == id) {
                state.pending.take().zip(state.staged.take())
            } else {
                None
            }
        };
        let Some((pending, config)) = pending else {
            self.debug_log(format_args!("ignoring permission result for stale request {}", id));
            return;
        };

        self.debug_log(format_args!("completing initialize, permission granted: {}", granted));
        let result: InitializeResult = if granted {
            self.open_fresh_device(config).map(|()| {
                self.set_status(RecorderStatus::Initialized);
                InitializeOutcome::granted()
            })
        } else {
            Ok(InitializeOutcome::denied())
        };

        if let Err(e) = &result {
            log::warn!("[recorder {}] initialize failed: {}", self.id, e);
        }
        pending.resolve(result);
    }

    fn open_fresh_device(&self, config: CaptureConfig) -> Result<(), CaptureError> {
        let mut adapter = self.adapter.lock();
        adapter.release();
        adapter.configure(config.clone());
        adapter.open(&config)?;
        Ok(())
    }

    fn on_permission_result(&self, id: Uuid, granted: bool) {
        self.permission_granted.store(granted, Ordering::SeqCst);
        self.complete_initialize(id, granted);
    }

    fn clear_pending(&self, id: Uuid) {
        let mut state = self.state.lock();
        if state.pending.as_ref().is_some_and(|p| p.id() == id) {
            state.pending = None;
            state.staged = None;
        }
    }
}

/// A microphone capture session: permission gate, status machine and
/// period delivery over one capture device.
///
/// Control methods are meant for a single owner thread; period data arrives
/// on the device's I/O thread and is forwarded to the delegate from there.
/// Clones share the same session.
pub struct RecorderSession<B: CaptureBackend, P: PermissionProvider> {
    shared: Arc<SessionShared<B, P>>,
}

impl<B: CaptureBackend, P: PermissionProvider> Clone for RecorderSession<B, P> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B, P> RecorderSession<B, P>
where
    B: CaptureBackend + 'static,
    P: PermissionProvider + 'static,
{
    pub fn new(backend: B, permission: P) -> Self {
        let events = Arc::new(EventRelay::new());
        let mut adapter = CaptureDeviceAdapter::new(backend);
        adapter.set_sink(Arc::clone(&events) as Arc<dyn PeriodSink>);

        Self {
            shared: Arc::new(SessionShared {
                id: Uuid::new_v4(),
                adapter: Mutex::new(adapter),
                permission,
                permission_granted: AtomicBool::new(false),
                debug_logging: AtomicBool::new(false),
                state: Mutex::new(SessionState {
                    status: RecorderStatus::Unset,
                    sample_rate: DEFAULT_SAMPLE_RATE,
                    pending: None,
                    staged: None,
                }),
                events,
            }),
        }
    }

    pub fn set_delegate(&self, delegate: Arc<dyn RecorderDelegate>) {
        *self.shared.events.delegate.write() = Some(delegate);
    }

    pub fn clear_delegate(&self) {
        *self.shared.events.delegate.write() = None;
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn status(&self) -> RecorderStatus {
        self.shared.state.lock().status
    }

    /// Sample rate of the last initialize request.
    pub fn sample_rate(&self) -> u32 {
        self.shared.state.lock().sample_rate
    }

    /// Configuration of the current device. A pending initialize's
    /// configuration takes over only once permission is granted.
    pub fn config(&self) -> Option<CaptureConfig> {
        self.shared.adapter.lock().config().cloned()
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.shared.events.diagnostics.lock().clone()
    }

    pub fn is_initialize_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    /// Cached grant, else a fresh check. Only a positive answer is cached.
    pub fn has_permission(&self) -> bool {
        if self.shared.permission_granted.load(Ordering::SeqCst) {
            return true;
        }
        let granted = self.shared.permission.check();
        if granted {
            self.shared.permission_granted.store(true, Ordering::SeqCst);
        }
        granted
    }

    /// Configure the device for `args.sample_rate` and open it once
    /// permission is granted.
    ///
    /// The returned request is already resolved when permission was
    /// granted beforehand. Otherwise permission is requested and the request
    /// resolves when the answer arrives. Fails with `InitializeInProgress`
    /// while an earlier request is unresolved, and with `DeviceUnavailable`
    /// when no configuration exists for the rate.
    pub fn initialize(&self, args: InitializeArgs) -> Result<PendingInitialize, CaptureError> {
        let shared = &self.shared;
        shared.debug_logging.store(args.show_logs, Ordering::Relaxed);

        let pending = {
            let mut state = shared.state.lock();
            if state.pending.is_some() {
                return Err(CaptureError::InitializeInProgress);
            }
            state.sample_rate = args.sample_rate;

            let weak: Weak<SessionShared<B, P>> = Arc::downgrade(shared);
            let pending = PendingInitialize::new(move |id| {
                if let Some(shared) = weak.upgrade() {
                    shared.clear_pending(id);
                }
            });
            state.pending = Some(pending.clone());
            pending
        };

        let negotiated = shared.adapter.lock().negotiate(args.sample_rate);
        match negotiated {
            Ok(config) => shared.state.lock().staged = Some(config),
            Err(e) => {
                shared.clear_pending(pending.id());
                let err = CaptureError::from(e);
                pending.resolve(Err(err.clone()));
                log::warn!("[recorder {}] configure failed: {}", shared.id, err);
                return Err(err);
            }
        }

        let granted = shared.permission.check();
        shared.permission_granted.store(granted, Ordering::SeqCst);

        if granted {
            shared.debug_log(format_args!("has permission, completing"));
            shared.complete_initialize(pending.id(), true);
        } else {
            shared.debug_log(format_args!("requesting microphone permission"));
            let weak = Arc::downgrade(shared);
            let id = pending.id();
            shared.permission.request(Box::new(move |granted| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_permission_result(id, granted);
                }
            }));
        }

        shared.debug_log(format_args!("leaving initialize"));
        Ok(pending)
    }

    /// Start capturing. Succeeds without an event when already recording.
    pub fn start_recording(&self) -> Result<(), CaptureError> {
        let shared = &self.shared;
        {
            let mut adapter = shared.adapter.lock();
            if adapter.is_recording() {
                return Ok(());
            }
            if shared.state.lock().status == RecorderStatus::Unset {
                return Err(CaptureError::FailedToRecord("recorder not initialized".into()));
            }
            let config = adapter.config().cloned().ok_or(DeviceError::NotConfigured)?;

            // Reopens if the handle was released since initialize.
            adapter.open(&config).map_err(|e| {
                log::warn!("[recorder {}] reopen failed: {}", shared.id, e);
                CaptureError::FailedToRecord(e.to_string())
            })?;
            adapter.start().map_err(|e| {
                shared.debug_log(format_args!("record() failed: {}", e));
                CaptureError::from(e)
            })?;
        }
        shared.set_status(RecorderStatus::Playing);
        Ok(())
    }

    /// Stop capturing. Succeeds without an event when already stopped.
    pub fn stop_recording(&self) -> Result<(), CaptureError> {
        let shared = &self.shared;
        {
            let mut adapter = shared.adapter.lock();
            if adapter.device().is_none() {
                return Err(DeviceError::NotOpened.into());
            }
            if !adapter.is_recording() {
                return Ok(());
            }
            adapter.stop().map_err(|e| {
                shared.debug_log(format_args!("stop() failed: {}", e));
                CaptureError::from(e)
            })?;
        }
        shared.set_status(RecorderStatus::Stopped);
        Ok(())
    }

    /// Tear down: silence callbacks, release the device, reset the session
    /// and drop the delegate. An unresolved initialize resolves `Cancelled`.
    pub fn detach(&self) {
        let shared = &self.shared;
        shared.adapter.lock().teardown();

        let pending = {
            let mut state = shared.state.lock();
            state.status = RecorderStatus::Unset;
            state.staged = None;
            state.pending.take()
        };
        if let Some(pending) = pending {
            pending.resolve(Err(CaptureError::Cancelled));
        }

        self.clear_delegate();
        log::debug!("[recorder {}] detached", shared.id);
    }
}

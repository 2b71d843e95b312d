use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Deserialize;
use serde_json::Value;

use crate::channel::method::{MethodCall, MethodResponse};
use crate::models::config::InitializeArgs;
use crate::models::error::CaptureError;
use crate::models::event::{PlatformEvent, PLATFORM_EVENT_METHOD};
use crate::session::pending::{InitializeResult, PendingInitialize};
use crate::session::recorder::RecorderSession;
use crate::traits::capture_device::CaptureBackend;
use crate::traits::permission::PermissionProvider;
use crate::traits::recorder_delegate::EventChannelDelegate;

/// Arguments of `initializeRecorder`; both fields may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeRecorderArgs {
    sample_rate: Option<u32>,
    show_logs: Option<bool>,
}

enum Dispatch {
    Now(MethodResponse),
    Later(PendingInitialize),
}

/// Routes shell method calls to a [`RecorderSession`].
///
/// | method               | success payload                          |
/// |----------------------|------------------------------------------|
/// | `hasPermission`      | `bool`                                   |
/// | `initializeRecorder` | `{ success, isMeteringEnabled }`         |
/// | `startRecording`     | `true`                                   |
/// | `stopRecording`      | `true`                                   |
/// | `getPlatformVersion` | `"<os> <arch>"`                          |
///
/// Every call is answered, including calls that fail to decode or panic.
pub struct RecorderChannel<B: CaptureBackend, P: PermissionProvider> {
    session: RecorderSession<B, P>,
}

impl<B, P> RecorderChannel<B, P>
where
    B: CaptureBackend + 'static,
    P: PermissionProvider + 'static,
{
    pub fn new(session: RecorderSession<B, P>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &RecorderSession<B, P> {
        &self.session
    }

    /// Push session events to the shell as `(method, payload)` pairs.
    pub fn attach_emitter(&self, emit: impl Fn(&str, Value) + Send + Sync + 'static) {
        self.session
            .set_delegate(EventChannelDelegate::new(move |event: PlatformEvent| {
                emit(PLATFORM_EVENT_METHOD, event.to_value())
            }));
    }

    /// The shell went away: release the device and drop the emitter.
    pub fn detach(&self) {
        self.session.detach();
    }

    /// Handle one call. `reply` runs exactly once, possibly later on the
    /// thread that delivers the permission answer.
    pub fn handle(&self, call: MethodCall, reply: impl FnOnce(MethodResponse) + Send + 'static) {
        let dispatched = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(&call)));
        match dispatched {
            Ok(Ok(Dispatch::Now(response))) => reply(response),
            Ok(Ok(Dispatch::Later(pending))) => {
                pending.on_resolved(move |result| reply(initialize_response(result)));
            }
            Ok(Err(err)) => {
                log::error!("{} failed: {}", call.method, err);
                reply(MethodResponse::failure(&format!("Failed to handle {}", call.method), &err));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Unexpected failure handling {}: {}", call.method, message);
                reply(MethodResponse::unknown(message));
            }
        }
    }

    fn dispatch(&self, call: &MethodCall) -> Result<Dispatch, CaptureError> {
        let response = match call.method.as_str() {
            "hasPermission" => MethodResponse::Success(Value::Bool(self.session.has_permission())),
            "initializeRecorder" => {
                let args = self.initialize_args(&call.arguments)?;
                return self.session.initialize(args).map(Dispatch::Later);
            }
            "startRecording" => match self.session.start_recording() {
                Ok(()) => MethodResponse::Success(Value::Bool(true)),
                Err(e) => MethodResponse::failure("Failed to start recording", &e),
            },
            "stopRecording" => match self.session.stop_recording() {
                Ok(()) => MethodResponse::Success(Value::Bool(true)),
                Err(e) => MethodResponse::failure("Failed to stop recording", &e),
            },
            "getPlatformVersion" => MethodResponse::Success(Value::String(platform_version())),
            _ => MethodResponse::NotImplemented,
        };
        Ok(Dispatch::Now(response))
    }

    fn initialize_args(&self, arguments: &Value) -> Result<InitializeArgs, CaptureError> {
        let raw = if arguments.is_null() {
            InitializeRecorderArgs::default()
        } else {
            InitializeRecorderArgs::deserialize(arguments)
                .map_err(|e| CaptureError::Unknown(format!("invalid initializeRecorder arguments: {}", e)))?
        };
        Ok(InitializeArgs {
            sample_rate: raw.sample_rate.unwrap_or_else(|| self.session.sample_rate()),
            show_logs: raw.show_logs.unwrap_or(false),
        })
    }
}

fn initialize_response(result: InitializeResult) -> MethodResponse {
    match result {
        Ok(outcome) => match serde_json::to_value(outcome) {
            Ok(value) => MethodResponse::Success(value),
            Err(e) => MethodResponse::unknown(e.to_string()),
        },
        Err(e) => MethodResponse::failure("Failed to initialize recorder", &e),
    }
}

fn platform_version() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::models::config::{CaptureConfig, ChannelMask, NotificationSchedule, SampleFormat};
    use crate::models::state::{DeviceState, RecordingState};
    use crate::processing::pcm::decode_le_i16;
    use crate::sim::{ScriptedPermission, SimulatedBackend};
    use crate::traits::capture_device::{CaptureDevice, PositionListener};

    type Channel = RecorderChannel<SimulatedBackend, ScriptedPermission>;

    fn channel(
        permission: ScriptedPermission,
    ) -> (Channel, SimulatedBackend, Arc<Mutex<Vec<(String, Value)>>>) {
        let backend = SimulatedBackend::new(4);
        let channel = RecorderChannel::new(RecorderSession::new(backend.clone(), permission));
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        channel.attach_emitter(move |method, payload| sink.lock().push((method.to_string(), payload)));
        (channel, backend, events)
    }

    fn call<B, P>(channel: &RecorderChannel<B, P>, call: MethodCall) -> mpsc::Receiver<MethodResponse>
    where
        B: CaptureBackend + 'static,
        P: PermissionProvider + 'static,
    {
        let (tx, rx) = mpsc::channel();
        channel.handle(call, move |response| {
            let _ = tx.send(response);
        });
        rx
    }

    fn answer<B, P>(channel: &RecorderChannel<B, P>, request: MethodCall) -> MethodResponse
    where
        B: CaptureBackend + 'static,
        P: PermissionProvider + 'static,
    {
        call(channel, request)
            .recv_timeout(Duration::from_secs(1))
            .expect("call was not answered")
    }

    fn init(sample_rate: u32) -> MethodCall {
        MethodCall::new(
            "initializeRecorder",
            json!({"sampleRate": sample_rate, "showLogs": false}),
        )
    }

    #[test]
    fn initialize_with_permission_answers_synchronously() {
        let (channel, _, events) = channel(ScriptedPermission::granted());
        let response = answer(&channel, init(16000));
        assert_eq!(
            response,
            MethodResponse::Success(json!({"success": true, "isMeteringEnabled": true}))
        );
        assert_eq!(
            *events.lock(),
            vec![(
                "platformEvent".to_string(),
                json!({"name": "recorderStatus", "data": "Initialized"})
            )]
        );
    }

    #[test]
    fn initialize_reply_deferred_until_permission_answer() {
        let permission = ScriptedPermission::prompting();
        let (channel, _, events) = channel(permission.clone());
        let rx = call(&channel, init(16000));

        assert!(rx.try_recv().is_err());
        permission.answer(false);

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            MethodResponse::Success(json!({"success": false, "isMeteringEnabled": false}))
        );
        assert!(events.lock().is_empty());
    }

    #[test]
    fn overlapping_initialize_gets_an_error() {
        let permission = ScriptedPermission::prompting();
        let (channel, _, _) = channel(permission.clone());
        let first = call(&channel, init(16000));

        let second = answer(&channel, init(16000));
        assert_eq!(second.error_code(), Some("InitializeInProgress"));

        permission.answer(true);
        assert!(first.recv_timeout(Duration::from_secs(1)).unwrap().is_success());
    }

    #[test]
    fn initialize_defaults_and_bad_arguments() {
        let (channel, _, _) = channel(ScriptedPermission::granted());
        assert!(answer(&channel, MethodCall::bare("initializeRecorder")).is_success());
        assert_eq!(channel.session().sample_rate(), 16000);

        let bad = answer(
            &channel,
            MethodCall::new("initializeRecorder", json!({"sampleRate": "fast"})),
        );
        assert_eq!(bad.error_code(), Some("Unknown"));
    }

    #[test]
    fn omitted_rate_keeps_previous_value() {
        let (channel, _, _) = channel(ScriptedPermission::granted());
        answer(&channel, init(44100));
        answer(&channel, MethodCall::new("initializeRecorder", json!({"showLogs": true})));
        assert_eq!(channel.session().sample_rate(), 44100);
    }

    #[test]
    fn start_before_initialize_is_failed_to_record() {
        let (channel, _, _) = channel(ScriptedPermission::granted());
        match answer(&channel, MethodCall::bare("startRecording")) {
            MethodResponse::Error { code, message, details } => {
                assert_eq!(code, "FailedToRecord");
                assert_eq!(message, "Failed to start recording");
                assert!(details.is_some());
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn record_cycle_emits_status_and_data() {
        let (channel, backend, events) = channel(ScriptedPermission::granted());
        answer(&channel, init(16000));
        assert_eq!(
            answer(&channel, MethodCall::bare("startRecording")),
            MethodResponse::Success(json!(true))
        );
        assert!(answer(&channel, MethodCall::bare("startRecording")).is_success());

        backend.feed(&[1, -2, 3, -4, 5]);
        assert!(answer(&channel, MethodCall::bare("stopRecording")).is_success());
        assert!(answer(&channel, MethodCall::bare("stopRecording")).is_success());

        let events = events.lock();
        let names: Vec<String> = events
            .iter()
            .map(|(_, payload)| {
                format!(
                    "{}:{}",
                    payload["name"].as_str().unwrap(),
                    payload["data"].as_str().unwrap_or("bytes")
                )
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "recorderStatus:Initialized",
                "recorderStatus:Playing",
                "dataPeriod:bytes",
                "recorderStatus:Stopped",
            ]
        );

        let bytes: Vec<u8> = events[2].1["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|b| b.as_u64().unwrap() as u8)
            .collect();
        assert_eq!(decode_le_i16(&bytes), vec![1, -2, 3, -4]);
    }

    #[test]
    fn has_permission_and_platform_version() {
        let (channel, _, _) = channel(ScriptedPermission::granted());
        assert_eq!(
            answer(&channel, MethodCall::bare("hasPermission")),
            MethodResponse::Success(json!(true))
        );
        match answer(&channel, MethodCall::bare("getPlatformVersion")) {
            MethodResponse::Success(Value::String(v)) => assert!(v.contains(std::env::consts::OS)),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn unknown_method_not_implemented() {
        let (channel, _, _) = channel(ScriptedPermission::granted());
        assert_eq!(
            answer(&channel, MethodCall::bare("startPlayer")),
            MethodResponse::NotImplemented
        );
    }

    #[test]
    fn detach_stops_events() {
        let (channel, backend, events) = channel(ScriptedPermission::granted());
        answer(&channel, init(16000));
        answer(&channel, MethodCall::bare("startRecording"));
        channel.detach();

        let before = events.lock().len();
        assert!(!backend.feed(&[0; 8]));
        assert_eq!(events.lock().len(), before);
    }

    /// Backend whose devices panic when asked to start.
    #[derive(Clone)]
    struct PanickingBackend;

    struct PanickingDevice;

    impl CaptureDevice for PanickingDevice {
        fn state(&self) -> DeviceState {
            DeviceState::Initialized
        }

        fn recording_state(&self) -> RecordingState {
            RecordingState::Stopped
        }

        fn set_position_listener(
            &self,
            _listener: Option<Arc<dyn PositionListener>>,
            _schedule: NotificationSchedule,
        ) {
        }

        fn start_recording(&self) -> Result<(), String> {
            panic!("driver crashed")
        }

        fn stop(&self) -> Result<(), String> {
            Ok(())
        }

        fn release(&self) {}
    }

    impl CaptureBackend for PanickingBackend {
        type Device = PanickingDevice;

        fn min_buffer_frames(&self, _: u32, _: ChannelMask, _: SampleFormat) -> Option<usize> {
            Some(4)
        }

        fn open_device(&self, _config: &CaptureConfig) -> Result<PanickingDevice, String> {
            Ok(PanickingDevice)
        }
    }

    #[test]
    fn panic_during_dispatch_still_answers() {
        let session = RecorderSession::new(PanickingBackend, ScriptedPermission::granted());
        let channel = RecorderChannel::new(session);
        assert!(answer(&channel, init(16000)).is_success());

        let response = answer(&channel, MethodCall::bare("startRecording"));
        assert_eq!(response.error_code(), Some("Unknown"));
        assert_eq!(response, MethodResponse::unknown("driver crashed"));
    }
}

use std::sync::Arc;

use crate::models::event::PlatformEvent;
use crate::models::state::RecorderStatus;

/// Outbound notifications of a recorder session.
///
/// `on_status_changed` runs on the thread that caused the transition;
/// `on_data_period` runs on the device I/O thread and should return quickly.
pub trait RecorderDelegate: Send + Sync {
    fn on_status_changed(&self, status: RecorderStatus);

    /// `pcm` is little-endian 16-bit signed mono, two bytes per sample.
    fn on_data_period(&self, pcm: &[u8]);
}

type Emitter = dyn Fn(PlatformEvent) + Send + Sync + 'static;

/// Delegate that turns notifications into `PlatformEvent`s for the shell.
pub struct EventChannelDelegate {
    emit: Box<Emitter>,
}

impl EventChannelDelegate {
    pub fn new(emit: impl Fn(PlatformEvent) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            emit: Box::new(emit),
        })
    }
}

impl RecorderDelegate for EventChannelDelegate {
    fn on_status_changed(&self, status: RecorderStatus) {
        (self.emit)(PlatformEvent::RecorderStatus(status));
    }

    fn on_data_period(&self, pcm: &[u8]) {
        (self.emit)(PlatformEvent::DataPeriod(pcm.to_vec()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn forwards_as_platform_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let delegate = EventChannelDelegate::new(move |event| sink.lock().push(event));

        delegate.on_status_changed(RecorderStatus::Playing);
        delegate.on_data_period(&[1, 2]);

        assert_eq!(
            *seen.lock(),
            vec![
                PlatformEvent::RecorderStatus(RecorderStatus::Playing),
                PlatformEvent::DataPeriod(vec![1, 2]),
            ]
        );
    }
}

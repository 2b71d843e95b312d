use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::NotificationSchedule;
use crate::processing::position::{Boundary, Notification, PositionTracker};
use crate::processing::ring_buffer::RingBuffer;
use crate::traits::capture_device::{PositionListener, SampleReader};

/// Device-side sample store shared by the capture backends.
///
/// Captured samples land in a ring buffer. Writes are split at notification
/// boundaries, and each boundary is stamped with its sample position, so a
/// notification delivered late still sees exactly the frames captured up to
/// its boundary. The ring must hold at least one backend callback plus
/// whatever is waiting for delivery; older samples are overwritten.
pub struct CaptureBuffer {
    ring: Mutex<RingBuffer>,
    tracker: Mutex<PositionTracker>,
    listener: Mutex<Option<Arc<dyn PositionListener>>>,
}

/// Reader handed to a listener, bounded by the boundary it serves.
struct BoundedReader<'a> {
    buffer: &'a CaptureBuffer,
    limit: u64,
}

impl SampleReader for BoundedReader<'_> {
    fn read(&self, buf: &mut [i16]) -> usize {
        self.buffer.ring.lock().read_until(buf, self.limit)
    }
}

impl CaptureBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            tracker: Mutex::new(PositionTracker::new(NotificationSchedule::default())),
            listener: Mutex::new(None),
        }
    }

    /// Replace the listener. The notification count restarts from zero.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn PositionListener>>,
        schedule: NotificationSchedule,
    ) {
        *self.tracker.lock() = PositionTracker::new(schedule);
        *self.listener.lock() = listener;
    }

    /// Append captured samples, calling `on_boundary` for each boundary in
    /// capture order. No lock is held while `on_boundary` runs, so it may
    /// deliver inline or queue the boundary for another thread.
    pub fn push(&self, samples: &[i16], mut on_boundary: impl FnMut(Boundary)) {
        let mut rest = samples;
        while !rest.is_empty() {
            let step = self
                .tracker
                .lock()
                .frames_to_next_boundary()
                .map_or(rest.len(), |d| d.min(rest.len()));
            let (chunk, tail) = rest.split_at(step);

            let position = {
                let mut ring = self.ring.lock();
                ring.write(chunk);
                ring.position() + ring.count() as u64
            };
            let crossed = self.tracker.lock().advance(step);

            if crossed.periodic > 0 {
                on_boundary(Boundary {
                    kind: Notification::Periodic,
                    position,
                });
            }
            if crossed.markers > 0 {
                on_boundary(Boundary {
                    kind: Notification::Marker,
                    position,
                });
            }
            rest = tail;
        }
    }

    /// Hand a boundary to the registered listener on the calling thread.
    pub fn deliver(&self, boundary: Boundary) {
        let listener = self.listener.lock().clone();
        let Some(listener) = listener else {
            return;
        };
        let reader = BoundedReader {
            buffer: self,
            limit: boundary.position,
        };
        match boundary.kind {
            Notification::Periodic => listener.on_periodic_notification(&reader),
            Notification::Marker => listener.on_marker_reached(&reader),
        }
    }

    /// `push` with every notification delivered inline.
    pub fn push_and_deliver(&self, samples: &[i16]) {
        self.push(samples, |b| self.deliver(b));
    }

    pub fn clear(&self) {
        self.ring.lock().reset();
    }

    pub fn available(&self) -> usize {
        self.ring.lock().count()
    }

    pub fn captured_frames(&self) -> u64 {
        self.tracker.lock().captured()
    }

    pub fn dropped(&self) -> u64 {
        self.ring.lock().dropped()
    }
}

impl SampleReader for CaptureBuffer {
    fn read(&self, buf: &mut [i16]) -> usize {
        self.ring.lock().read_into(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads one period per periodic notification and drains on markers,
    /// recording what it saw.
    struct Recorder {
        take: usize,
        periods: Mutex<Vec<Vec<i16>>>,
        drained: Mutex<Vec<usize>>,
    }

    impl PositionListener for Recorder {
        fn on_periodic_notification(&self, reader: &dyn SampleReader) {
            let mut buf = vec![0; self.take];
            let n = reader.read(&mut buf);
            buf.truncate(n);
            self.periods.lock().push(buf);
        }

        fn on_marker_reached(&self, reader: &dyn SampleReader) {
            let mut buf = vec![0; self.take * 2];
            self.drained.lock().push(reader.read(&mut buf));
        }
    }

    fn listening(capacity: usize, period: usize) -> (CaptureBuffer, Arc<Recorder>) {
        let buffer = CaptureBuffer::new(capacity);
        let rec = Arc::new(Recorder {
            take: period,
            periods: Mutex::new(Vec::new()),
            drained: Mutex::new(Vec::new()),
        });
        let listener: Arc<dyn PositionListener> = rec.clone();
        buffer.set_listener(
            Some(listener),
            NotificationSchedule {
                period_frames: period,
                marker_frames: period * 2,
            },
        );
        (buffer, rec)
    }

    fn range(from: i16, to: i16) -> Vec<i16> {
        (from..=to).collect()
    }

    #[test]
    fn periodic_sees_exactly_one_period() {
        let (buffer, rec) = listening(8, 4);
        buffer.push_and_deliver(&range(0, 9));

        assert_eq!(*rec.periods.lock(), vec![range(0, 3), range(4, 7)]);
        assert_eq!(*rec.drained.lock(), vec![0]);
        assert_eq!(buffer.available(), 2);
        assert_eq!(buffer.captured_frames(), 10);
    }

    #[test]
    fn boundaries_reported_in_order() {
        let buffer = CaptureBuffer::new(8);
        buffer.set_listener(
            None,
            NotificationSchedule {
                period_frames: 2,
                marker_frames: 4,
            },
        );

        let mut seen = Vec::new();
        buffer.push(&[0; 5], |b| seen.push((b.kind, b.position)));

        assert_eq!(
            seen,
            vec![
                (Notification::Periodic, 2),
                (Notification::Periodic, 4),
                (Notification::Marker, 4)
            ]
        );
    }

    #[test]
    fn late_delivery_stops_at_each_boundary() {
        let (buffer, rec) = listening(16, 4);
        let mut queued = Vec::new();

        buffer.push(&range(1, 6), |b| queued.push(b));
        buffer.push(&range(7, 11), |b| queued.push(b));
        for b in queued.drain(..) {
            buffer.deliver(b);
        }

        assert_eq!(*rec.periods.lock(), vec![range(1, 4), range(5, 8)]);
        // The marker at frame 8 must not swallow frames 9..=11.
        assert_eq!(*rec.drained.lock(), vec![0]);
        assert_eq!(buffer.available(), 3);

        buffer.push(&range(12, 16), |b| queued.push(b));
        for b in queued.drain(..) {
            buffer.deliver(b);
        }
        assert_eq!(
            *rec.periods.lock(),
            vec![range(1, 4), range(5, 8), range(9, 12), range(13, 16)]
        );
        assert_eq!(*rec.drained.lock(), vec![0, 0]);
    }

    #[test]
    fn late_delivery_of_one_large_chunk() {
        let (buffer, rec) = listening(16, 4);
        let mut queued = Vec::new();
        buffer.push(&range(1, 10), |b| queued.push(b));
        for b in queued {
            buffer.deliver(b);
        }

        assert_eq!(*rec.periods.lock(), vec![range(1, 4), range(5, 8)]);
        assert_eq!(buffer.dropped(), 0);
        assert_eq!(buffer.available(), 2);
    }

    #[test]
    fn undersized_ring_loses_only_overwritten_samples() {
        let (buffer, rec) = listening(8, 4);
        let mut queued = Vec::new();
        buffer.push(&range(1, 10), |b| queued.push(b));
        for b in queued {
            buffer.deliver(b);
        }

        assert_eq!(buffer.dropped(), 2);
        assert_eq!(*rec.periods.lock(), vec![range(3, 4), range(5, 8)]);
    }

    #[test]
    fn no_listener_keeps_samples() {
        let buffer = CaptureBuffer::new(4);
        buffer.push_and_deliver(&[1, 2, 3]);
        assert_eq!(buffer.available(), 3);

        let mut out = [0; 4];
        assert_eq!(buffer.read(&mut out), 3);
        assert_eq!(&out[..3], &[1, 2, 3]);
    }
}

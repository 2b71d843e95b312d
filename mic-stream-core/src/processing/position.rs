use crate::models::config::NotificationSchedule;

/// A position notification due at a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Periodic,
    Marker,
}

/// A notification raised at absolute sample position `position`. A listener
/// serving it never reads samples captured after that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub kind: Notification,
    pub position: u64,
}

/// Boundaries crossed by one advance of the capture position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Crossings {
    pub periodic: u64,
    pub markers: u64,
}

/// Counts captured frames against a notification schedule.
#[derive(Debug, Clone)]
pub struct PositionTracker {
    schedule: NotificationSchedule,
    captured: u64,
}

impl PositionTracker {
    pub fn new(schedule: NotificationSchedule) -> Self {
        Self {
            schedule,
            captured: 0,
        }
    }

    /// Frames that can be captured before the next boundary, or `None`
    /// when no notification is scheduled.
    pub fn frames_to_next_boundary(&self) -> Option<usize> {
        let period = distance(self.captured, self.schedule.period_frames);
        let marker = distance(self.captured, self.schedule.marker_frames);
        match (period, marker) {
            (Some(p), Some(m)) => Some(p.min(m)),
            (p, None) => p,
            (None, m) => m,
        }
    }

    pub fn advance(&mut self, frames: usize) -> Crossings {
        let before = self.captured;
        self.captured += frames as u64;
        Crossings {
            periodic: crossed(before, self.captured, self.schedule.period_frames),
            markers: crossed(before, self.captured, self.schedule.marker_frames),
        }
    }

    pub fn captured(&self) -> u64 {
        self.captured
    }
}

fn distance(position: u64, every: usize) -> Option<usize> {
    if every == 0 {
        return None;
    }
    Some(every - (position % every as u64) as usize)
}

fn crossed(before: u64, after: u64, every: usize) -> u64 {
    if every == 0 {
        return 0;
    }
    let every = every as u64;
    after / every - before / every
}

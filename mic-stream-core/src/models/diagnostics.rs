use chrono::{DateTime, Utc};
use serde::Serialize;

/// Delivery counters for debugging a capture session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionDiagnostics {
    pub periods_delivered: u64,
    pub samples_delivered: u64,
    pub bytes_delivered: u64,
    pub marker_drains: u64,
    pub samples_drained: u64,
    /// Events produced while no delegate was attached.
    pub events_dropped: u64,
    pub last_period_at: Option<DateTime<Utc>>,
}

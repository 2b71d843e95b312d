//! Choosing a capture period from what an input device advertises.
//!
//! Kept free of `cpal` types so the selection rules are testable without
//! audio hardware.

/// One supported input configuration, reduced to what period selection needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConfigRange {
    pub channels: u16,
    pub min_sample_rate: u32,
    pub max_sample_rate: u32,
    /// Whether samples are delivered as signed 16-bit integers.
    pub is_i16: bool,
    /// Smallest buffer the host accepts, when it says.
    pub min_buffer_frames: Option<u32>,
    pub max_buffer_frames: Option<u32>,
}

impl InputConfigRange {
    pub fn supports(&self, sample_rate: u32) -> bool {
        self.channels == 1
            && self.is_i16
            && (self.min_sample_rate..=self.max_sample_rate).contains(&sample_rate)
    }
}

/// Hosts that do not report buffer limits get 100 ms periods.
pub fn fallback_period_frames(sample_rate: u32) -> usize {
    (sample_rate / 10).max(1) as usize
}

/// Minimum buffer, in frames, for mono 16-bit capture at `sample_rate`.
///
/// `None` when no advertised configuration matches. Among matching
/// configurations the smallest reported minimum wins.
pub fn select_period_frames(ranges: &[InputConfigRange], sample_rate: u32) -> Option<usize> {
    if sample_rate == 0 {
        return None;
    }
    let matching: Vec<&InputConfigRange> = ranges.iter().filter(|r| r.supports(sample_rate)).collect();
    if matching.is_empty() {
        return None;
    }
    let reported = matching
        .iter()
        .filter_map(|r| r.min_buffer_frames)
        .filter(|frames| *frames > 0)
        .min();
    Some(reported.map_or_else(|| fallback_period_frames(sample_rate), |f| f as usize))
}

/// Buffer size to request from the host so each callback carries about
/// one period. `None` leaves the choice to the host.
pub fn fixed_buffer_frames(ranges: &[InputConfigRange], sample_rate: u32, period_frames: usize) -> Option<u32> {
    let wanted = u32::try_from(period_frames).ok()?;
    ranges
        .iter()
        .filter(|r| r.supports(sample_rate))
        .find_map(|r| match (r.min_buffer_frames, r.max_buffer_frames) {
            (Some(min), Some(max)) if min > 0 && min <= max => Some(wanted.clamp(min, max)),
            _ => None,
        })
}

/// Ring capacity for a device whose callbacks are delivered on another
/// thread: four buffers, and never less than one second of audio.
pub fn ring_capacity(buffer_frames: usize, sample_rate: u32) -> usize {
    buffer_frames.saturating_mul(4).max(sample_rate as usize)
}

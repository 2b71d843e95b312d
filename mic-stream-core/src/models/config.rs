use std::time::Duration;

use serde::Deserialize;

/// Sample rate used when the shell does not supply one.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Channel layout of the capture stream. Only mono is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelMask {
    #[default]
    Mono,
}

impl ChannelMask {
    pub fn channel_count(self) -> u16 {
        match self {
            Self::Mono => 1,
        }
    }
}

/// Sample encoding of the capture stream. Only 16-bit signed PCM is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    #[default]
    Pcm16,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm16 => 2,
        }
    }
}

/// When a device raises position notifications, in captured frames.
///
/// A zero interval disables that notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NotificationSchedule {
    /// Periodic notification fires every `period_frames` frames.
    pub period_frames: usize,
    /// Marker (end-of-buffer) notification fires every `marker_frames` frames.
    pub marker_frames: usize,
}

/// Device configuration derived from the backend's minimum buffer size.
///
/// `period_frames` is the smallest buffer the backend accepts for the
/// requested rate; the device buffer holds two periods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
    pub sample_format: SampleFormat,
    pub period_frames: usize,
    pub buffer_frames: usize,
}

impl CaptureConfig {
    pub fn from_period(sample_rate: u32, period_frames: usize) -> Self {
        Self {
            sample_rate,
            channel_mask: ChannelMask::Mono,
            sample_format: SampleFormat::Pcm16,
            period_frames,
            buffer_frames: period_frames * 2,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.period_frames == 0 {
            return Err("period must contain at least one frame".into());
        }
        if self.buffer_frames < self.period_frames {
            return Err(format!(
                "buffer of {} frames cannot hold a period of {} frames",
                self.buffer_frames, self.period_frames
            ));
        }
        Ok(())
    }

    /// Notification cadence: one period, and a marker at every buffer wrap.
    pub fn schedule(&self) -> NotificationSchedule {
        NotificationSchedule {
            period_frames: self.period_frames,
            marker_frames: self.buffer_frames,
        }
    }

    /// Wall-clock length of one period.
    pub fn period_duration(&self) -> Duration {
        Duration::from_secs_f64(self.period_frames as f64 / self.sample_rate as f64)
    }

    /// Size in bytes of a full period once serialized.
    pub fn period_bytes(&self) -> usize {
        self.period_frames * self.channel_mask.channel_count() as usize * self.sample_format.bytes_per_sample()
    }
}

/// Arguments of an initialize request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeArgs {
    pub sample_rate: u32,
    /// Verbose tracing of the initialize and permission flow.
    pub show_logs: bool,
}

impl InitializeArgs {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            show_logs: false,
        }
    }
}

impl Default for InitializeArgs {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            show_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_holds_two_periods() {
        let config = CaptureConfig::from_period(16000, 640);
        assert_eq!(config.buffer_frames, 1280);
        assert_eq!(config.period_bytes(), 1280);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.schedule(),
            NotificationSchedule {
                period_frames: 640,
                marker_frames: 1280
            }
        );
    }

    #[test]
    fn rejects_empty_period() {
        let config = CaptureConfig::from_period(16000, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_buffer_smaller_than_period() {
        let mut config = CaptureConfig::from_period(16000, 640);
        config.buffer_frames = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn period_duration_follows_rate() {
        let config = CaptureConfig::from_period(16000, 1600);
        assert_eq!(config.period_duration(), Duration::from_millis(100));
    }

    #[test]
    fn initialize_args_defaults() {
        let args: InitializeArgs = serde_json::from_str("{}").unwrap();
        assert_eq!(args, InitializeArgs::default());
        assert_eq!(args.sample_rate, DEFAULT_SAMPLE_RATE);

        let args: InitializeArgs =
            serde_json::from_str(r#"{"sampleRate": 44100, "showLogs": true}"#).unwrap();
        assert_eq!(args.sample_rate, 44100);
        assert!(args.show_logs);
    }
}

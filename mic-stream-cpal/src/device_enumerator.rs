//! Input device lookup through cpal's default host.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::buffer_size::InputConfigRange;
use crate::error::CpalError;

/// Resolves input devices on the default host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// The named device, or the default input device for `None`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, CpalError> {
        match name {
            None => self.host.default_input_device().ok_or(CpalError::NoDevice),
            Some(wanted) => self
                .host
                .input_devices()
                .map_err(|e| CpalError::Host(e.to_string()))?
                .find(|d| d.name().is_ok_and(|n| n == wanted))
                .ok_or_else(|| CpalError::DeviceNotFound(wanted.to_string())),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Supported input configurations of `device`, reduced for period selection.
/// Devices that refuse to report configurations yield an empty list.
pub fn input_configs(device: &cpal::Device) -> Vec<InputConfigRange> {
    let Ok(configs) = device.supported_input_configs() else {
        return Vec::new();
    };
    configs
        .map(|range| InputConfigRange {
            channels: range.channels(),
            min_sample_rate: range.min_sample_rate().0,
            max_sample_rate: range.max_sample_rate().0,
            is_i16: range.sample_format() == cpal::SampleFormat::I16,
            min_buffer_frames: match range.buffer_size() {
                cpal::SupportedBufferSize::Range { min, .. } => Some(*min),
                cpal::SupportedBufferSize::Unknown => None,
            },
            max_buffer_frames: match range.buffer_size() {
                cpal::SupportedBufferSize::Range { max, .. } => Some(*max),
                cpal::SupportedBufferSize::Unknown => None,
            },
        })
        .collect()
}

//! Microphone access on desktop hosts.
//!
//! Desktop audio hosts have no runtime consent prompt that cpal can drive.
//! Access counts as granted when a usable input device is present; the OS
//! privacy controls surface as a missing device or a stream build failure.

use mic_stream_core::traits::permission::{PermissionCallback, PermissionProvider};

use crate::device_enumerator::{input_configs, DeviceEnumerator};

#[derive(Debug, Clone, Default)]
pub struct DesktopPermission {
    device_name: Option<String>,
}

impl DesktopPermission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the named device instead of the default input.
    pub fn for_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl PermissionProvider for DesktopPermission {
    fn check(&self) -> bool {
        match DeviceEnumerator::new().find_input_device(self.device_name.as_deref()) {
            Ok(device) => !input_configs(&device).is_empty(),
            Err(e) => {
                log::debug!("microphone unavailable: {}", e);
                false
            }
        }
    }

    /// Answers at once with the current check.
    fn request(&self, on_result: PermissionCallback) {
        on_result(self.check());
    }
}

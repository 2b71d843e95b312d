pub mod capture_device;
pub mod permission;
pub mod recorder_delegate;

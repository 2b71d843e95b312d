//! In-process capture backend and permission provider.
//!
//! Used by the test suites and by hosts without audio hardware. The thread
//! calling [`SimulatedBackend::feed`] plays the role of the device I/O thread.

pub mod backend;
pub mod permission;

pub use backend::{SimulatedBackend, SimulatedDevice};
pub use permission::ScriptedPermission;

//! # mic-stream-cpal
//!
//! Desktop backend for mic-stream-core, built on cpal.
//!
//! Provides:
//! - `CpalBackend` / `CpalCaptureDevice`: mono 16-bit capture from an input device
//! - `DesktopPermission`: microphone availability as a permission check
//! - `DeviceEnumerator`: input device lookup
//! - `buffer_size`: period and buffer sizing from advertised configurations
//!
//! The cpal modules are behind the `cpal` feature, which pulls in the
//! platform audio libraries (ALSA on Linux).
//!
//! ## Usage
//! ```ignore
//! use mic_stream_cpal::{CpalBackend, DesktopPermission};
//! use mic_stream_core::{InitializeArgs, RecorderSession};
//!
//! let session = RecorderSession::new(CpalBackend::new(), DesktopPermission::new());
//! let outcome = session.initialize(InitializeArgs::new(16000))?.wait()?;
//! session.start_recording()?;
//! ```

pub mod buffer_size;
pub mod error;

#[cfg(feature = "cpal")]
pub mod cpal_backend;
#[cfg(feature = "cpal")]
pub mod device_enumerator;
#[cfg(feature = "cpal")]
pub mod permissions;

pub use error::CpalError;

#[cfg(feature = "cpal")]
pub use cpal_backend::{CpalBackend, CpalCaptureDevice};
#[cfg(feature = "cpal")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(feature = "cpal")]
pub use permissions::DesktopPermission;

/// A recorder session on the desktop backend.
#[cfg(feature = "cpal")]
pub type DesktopSession = mic_stream_core::RecorderSession<CpalBackend, DesktopPermission>;

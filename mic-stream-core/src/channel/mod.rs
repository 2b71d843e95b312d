//! Method-call surface for an application shell.
//!
//! Requests arrive as `MethodCall { method, arguments }` and are answered
//! exactly once through a reply callback; events leave as `platformEvent`
//! payloads.

pub mod dispatcher;
pub mod method;

pub use dispatcher::RecorderChannel;
pub use method::{MethodCall, MethodResponse, METHOD_CHANNEL_NAME};

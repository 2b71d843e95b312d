use serde::Deserialize;
use serde_json::Value;

use crate::models::error::CaptureError;

/// Channel name the shell binds to.
pub const METHOD_CHANNEL_NAME: &str = "com.micstream.capture:methods";

/// An inbound request from the shell.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// A call without arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

/// Answer to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Error {
        code: String,
        message: String,
        details: Option<String>,
    },
    NotImplemented,
}

impl MethodResponse {
    /// Structured failure carrying the error's kind and platform message.
    pub fn failure(message: &str, err: &CaptureError) -> Self {
        Self::Error {
            code: err.code().to_string(),
            message: message.to_string(),
            details: Some(err.details()),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Error {
            code: CaptureError::Unknown(String::new()).code().to_string(),
            details: Some(message.clone()),
            message,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

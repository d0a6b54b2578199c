use std::io;

use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failures raised while building, authenticating, dispatching or decoding a call
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request build error: {0}")]
    Build(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: status={status}")]
    Http { status: StatusCode, body: Bytes },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SdkErrorKind {
    #[serde(rename = "sdk_error")]
    SdkError,
}

/// Normalized failure used when the underlying error is not a typed API error.
///
/// Serializes as `{"type": "sdk_error", "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct SdkError {
    #[serde(rename = "type")]
    kind: SdkErrorKind,
    message: String,
}

impl SdkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: SdkErrorKind::SdkError,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&TransportError> for SdkError {
    fn from(err: &TransportError) -> Self {
        SdkError::new(err.to_string())
    }
}

impl From<TransportError> for SdkError {
    fn from(err: TransportError) -> Self {
        SdkError::from(&err)
    }
}

/// Normalize an arbitrary failure payload into an [`SdkError`].
///
/// Priority chain:
/// 1. a top-level string `message`
/// 2. a string `message` nested under `error`
/// 3. the whole payload serialized into an "unknown error" message
///
/// Missing or mistyped fields fall through to the next rule.
pub fn sdk_error(result: &Value) -> SdkError {
    if let Some(message) = result.get("message").and_then(Value::as_str) {
        return SdkError::new(message);
    }

    if let Some(message) = result
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
    {
        return SdkError::new(message);
    }

    SdkError::new(format!("Unknown error with SDK method {result}"))
}

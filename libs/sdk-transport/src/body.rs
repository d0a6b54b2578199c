use std::pin::Pin;

use bytes::Bytes;
use futures::stream::Stream;
use serde::Serialize;

use crate::error::TransportError;

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Response bytes handed to a `stream` callback.
pub type ByteStream = BoxStream<Result<Bytes, TransportError>>;

/// Outgoing request payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No payload
    #[default]
    Empty,
    /// Raw bytes sent as-is
    Bytes(Bytes),
    /// Serialized JSON; the transport sets `Content-Type: application/json`
    Json(Bytes),
}

impl Body {
    /// Create a body from a JSON-serializable value
    ///
    /// # Errors
    /// Returns `TransportError::Serialization` if the value cannot be serialized.
    pub fn from_json<T: Serialize>(value: &T) -> Result<Self, TransportError> {
        let json = serde_json::to_vec(value)?;
        Ok(Body::Json(Bytes::from(json)))
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Bytes(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Body::Json(_))
    }

    /// Payload bytes, if any
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Empty => None,
            Body::Bytes(bytes) | Body::Json(bytes) => Some(bytes),
        }
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Body::Empty
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&str> for Body {
    fn from(s: &str) -> Self {
        Body::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body() {
        let body = Body::from_json(&json!({"a": 1})).unwrap();
        assert!(body.is_json());
        assert_eq!(body.as_bytes().unwrap().as_ref(), br#"{"a":1}"#);
    }

    #[test]
    fn test_empty_body() {
        assert!(Body::default().is_empty());
        assert!(Body::from(()).as_bytes().is_none());
        assert!(!Body::from("x").is_empty());
    }
}

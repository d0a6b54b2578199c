use std::fmt;
use std::future::Future;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SdkError, TransportError};

/// Error arm of an [`SdkResponse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseError<E> {
    /// Normalized transport/parse failure
    Sdk(SdkError),
    /// Structured error body returned by the API, passed through unchanged
    Api(E),
}

impl<E> ResponseError<E> {
    pub fn as_sdk(&self) -> Option<&SdkError> {
        match self {
            ResponseError::Sdk(err) => Some(err),
            ResponseError::Api(_) => None,
        }
    }

    pub fn as_api(&self) -> Option<&E> {
        match self {
            ResponseError::Api(err) => Some(err),
            ResponseError::Sdk(_) => None,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for ResponseError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseError::Sdk(err) => write!(f, "{err}"),
            ResponseError::Api(err) => write!(f, "API error: {err:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for ResponseError<E> {}

impl<E> From<SdkError> for ResponseError<E> {
    fn from(err: SdkError) -> Self {
        ResponseError::Sdk(err)
    }
}

impl<E> From<TransportError> for ResponseError<E> {
    fn from(err: TransportError) -> Self {
        ResponseError::Sdk(SdkError::from(err))
    }
}

/// Result of a buffered call: exactly one of a value or an error.
///
/// Serializes as `{"ok": true, "value": ..}` or `{"ok": false, "error": ..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkResponse<T, E> {
    Success(T),
    Failure(ResponseError<E>),
}

impl<T, E> SdkResponse<T, E> {
    pub fn ok(value: T) -> Self {
        SdkResponse::Success(value)
    }

    pub fn api_error(error: E) -> Self {
        SdkResponse::Failure(ResponseError::Api(error))
    }

    pub fn sdk_error(error: impl Into<SdkError>) -> Self {
        SdkResponse::Failure(ResponseError::Sdk(error.into()))
    }

    /// The `ok` discriminant
    pub fn is_ok(&self) -> bool {
        matches!(self, SdkResponse::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            SdkResponse::Success(value) => Some(value),
            SdkResponse::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ResponseError<E>> {
        match self {
            SdkResponse::Success(_) => None,
            SdkResponse::Failure(error) => Some(error),
        }
    }

    /// # Errors
    /// Returns the error arm when the call failed.
    pub fn into_result(self) -> Result<T, ResponseError<E>> {
        match self {
            SdkResponse::Success(value) => Ok(value),
            SdkResponse::Failure(error) => Err(error),
        }
    }
}

impl<T, E> From<Result<T, ResponseError<E>>> for SdkResponse<T, E> {
    fn from(result: Result<T, ResponseError<E>>) -> Self {
        match result {
            Ok(value) => SdkResponse::Success(value),
            Err(error) => SdkResponse::Failure(error),
        }
    }
}

/// Await a call and unwrap its tagged result into a `Result`
///
/// # Errors
/// Returns the error arm when the call failed.
pub async fn sdk_ok<T, E, F>(call: F) -> Result<T, ResponseError<E>>
where
    F: Future<Output = SdkResponse<T, E>>,
{
    call.await.into_result()
}

impl<T: Serialize, E: Serialize> Serialize for SdkResponse<T, E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SdkResponse", 2)?;
        match self {
            SdkResponse::Success(value) => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("value", value)?;
            }
            SdkResponse::Failure(error) => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

#[derive(Deserialize)]
#[serde(bound = "T: DeserializeOwned, E: DeserializeOwned")]
struct RawSdkResponse<T, E> {
    ok: bool,
    #[serde(default, deserialize_with = "present")]
    value: Option<T>,
    #[serde(default, deserialize_with = "present")]
    error: Option<ResponseError<E>>,
}

/// `Some` whenever the key is present, even when its value is `null`
fn present<'de, D, V>(deserializer: D) -> Result<Option<V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    V::deserialize(deserializer).map(Some)
}

impl<'de, T: DeserializeOwned, E: DeserializeOwned> Deserialize<'de> for SdkResponse<T, E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSdkResponse::<T, E>::deserialize(deserializer)?;
        match (raw.ok, raw.value, raw.error) {
            (true, Some(value), None) => Ok(SdkResponse::Success(value)),
            (false, None, Some(error)) => Ok(SdkResponse::Failure(error)),
            (ok, value, error) => Err(D::Error::custom(format!(
                "inconsistent SdkResponse: ok={ok}, value present={}, error present={}",
                value.is_some(),
                error.is_some()
            ))),
        }
    }
}

use std::future::Future;

use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use http::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::value::{BytesDeserializer, Error as ValueError, StrDeserializer, UnitDeserializer};

use crate::body::ByteStream;
use crate::error::{SdkError, TransportError, sdk_error};
use crate::mode::{ContentTypePatterns, ResponseMode};
use crate::request::{RedirectPolicy, RequestProps};
use crate::response::SdkResponse;
use crate::settings::TransportSettings;
use crate::transport::{ApiCall, Transport};

/// Client-level knobs reqwest only accepts at build time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClientProfile {
    verify_ssl: bool,
    redirect: RedirectPolicy,
    max_redirects: usize,
    compress: bool,
}

impl ClientProfile {
    fn of(props: &RequestProps) -> Self {
        Self {
            verify_ssl: props.verify_ssl,
            redirect: props.redirect,
            max_redirects: props.max_redirects,
            compress: props.compress,
        }
    }

    fn defaults(settings: &TransportSettings) -> Self {
        Self {
            verify_ssl: settings.verify_ssl,
            redirect: RedirectPolicy::default(),
            max_redirects: crate::settings::DEFAULT_MAX_REDIRECTS,
            compress: true,
        }
    }

    fn build(self) -> Result<reqwest::Client, TransportError> {
        let redirect = match self.redirect {
            RedirectPolicy::Follow => reqwest::redirect::Policy::limited(self.max_redirects),
            RedirectPolicy::Manual => reqwest::redirect::Policy::none(),
            RedirectPolicy::Error => reqwest::redirect::Policy::custom(|attempt| {
                attempt.error("redirects are disabled for this call")
            }),
        };

        reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_ssl)
            .redirect(redirect)
            .gzip(self.compress)
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))
    }
}

/// [`Transport`] backed by `reqwest`
pub struct ReqwestTransport {
    settings: TransportSettings,
    patterns: ContentTypePatterns,
    http_client: reqwest::Client,
    profile: ClientProfile,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("settings", &self.settings)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Create a transport with the default content-type patterns
    ///
    /// # Errors
    /// Returns `TransportError::Build` if the HTTP client cannot be created.
    pub fn new(settings: TransportSettings) -> Result<Self, TransportError> {
        Self::with_patterns(settings, ContentTypePatterns::default())
    }

    /// # Errors
    /// Returns `TransportError::Build` if the HTTP client cannot be created.
    pub fn with_patterns(
        settings: TransportSettings,
        patterns: ContentTypePatterns,
    ) -> Result<Self, TransportError> {
        let profile = ClientProfile::defaults(&settings);
        let http_client = profile.build()?;

        Ok(Self {
            settings,
            patterns,
            http_client,
            profile,
        })
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    pub fn patterns(&self) -> &ContentTypePatterns {
        &self.patterns
    }

    /// Shared client, or a one-off client when the call overrides build-time knobs
    fn client_for(&self, props: &RequestProps) -> Result<reqwest::Client, TransportError> {
        let profile = ClientProfile::of(props);
        if profile == self.profile {
            Ok(self.http_client.clone())
        } else {
            profile.build()
        }
    }

    async fn send(&self, props: RequestProps) -> Result<reqwest::Response, TransportError> {
        let client = self.client_for(&props)?;

        tracing::debug!(method = %props.method, url = %props.url, "dispatching request");

        let mut req_builder = client
            .request(props.method.into(), &props.url)
            .headers(props.headers)
            .timeout(props.timeout);

        if let Some(bytes) = props.body.as_bytes() {
            req_builder = req_builder.body(bytes.clone());
        }

        req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(e.to_string())
            } else if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Reqwest(e)
            }
        })
    }

    async fn fetch<T, E>(&self, call: ApiCall<'_>) -> Result<SdkResponse<T, E>, TransportError>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        let prepared = call.prepare(&self.settings).await?;
        let max_body_size = prepared.props.max_body_size;
        let encoding = prepared.settings.encoding;

        let resp = self.send(prepared.props).await?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let mode = self.patterns.response_mode(&content_type);

        tracing::debug!(status = status.as_u16(), ?mode, content_type = %content_type, "response received");

        let body = read_body(resp, max_body_size).await?;
        let decoder = Decoder {
            patterns: &self.patterns,
            content_type: &content_type,
            encoding: encoding.as_deref(),
            mode,
        };

        if status.is_success() {
            decoder.value(&body).map(SdkResponse::ok)
        } else {
            Ok(decoder.failure(status, &body))
        }
    }
}

impl Transport for ReqwestTransport {
    async fn request<T, E>(&self, call: ApiCall<'_>) -> SdkResponse<T, E>
    where
        T: DeserializeOwned + Send,
        E: DeserializeOwned + Send,
    {
        let method = call.method();
        let path = call.path().to_owned();

        match self.fetch(call).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(%method, path = %path, error = %err, "request failed");
                SdkResponse::sdk_error(err)
            }
        }
    }

    async fn stream<T, F, Fut>(&self, callback: F, call: ApiCall<'_>) -> Result<T, TransportError>
    where
        T: Send,
        F: FnOnce(ByteStream) -> Fut + Send,
        Fut: Future<Output = T> + Send,
    {
        let prepared = call.prepare(&self.settings).await?;
        let resp = self.send(prepared.props).await?;
        let status = resp.status();

        if !status.is_success() {
            let body = match resp.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(status = status.as_u16(), error = %e, "failed to read error body");
                    Bytes::new()
                }
            };
            tracing::warn!(status = status.as_u16(), "stream request failed");
            return Err(TransportError::Http { status, body });
        }

        let stream = resp.bytes_stream().map_err(TransportError::Reqwest);
        Ok(callback(Box::pin(stream)).await)
    }
}

/// Buffer the whole body, enforcing `max_body_size` when set
async fn read_body(
    mut resp: reqwest::Response,
    max_body_size: Option<usize>,
) -> Result<Bytes, TransportError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = resp.chunk().await? {
        if let Some(max) = max_body_size
            && buf.len() + chunk.len() > max
        {
            return Err(TransportError::InvalidResponse(format!(
                "response body exceeds max_body_size of {max} bytes"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

/// Turns a buffered body into a typed value according to its response mode
struct Decoder<'a> {
    patterns: &'a ContentTypePatterns,
    content_type: &'a str,
    encoding: Option<&'a str>,
    mode: ResponseMode,
}

impl Decoder<'_> {
    fn text(&self, body: &Bytes) -> Result<String, TransportError> {
        let override_utf8 = self
            .encoding
            .is_some_and(|e| e.eq_ignore_ascii_case("utf-8") || e.eq_ignore_ascii_case("utf8"));
        let declares_charset = self.content_type.to_ascii_lowercase().contains("charset=");

        if self.patterns.is_utf8(self.content_type)
            || override_utf8
            || (!declares_charset && self.encoding.is_none())
        {
            String::from_utf8(body.to_vec())
                .map_err(|e| TransportError::InvalidResponse(format!("Invalid UTF-8: {e}")))
        } else {
            tracing::warn!(
                content_type = self.content_type,
                encoding = self.encoding,
                "non UTF-8 charset, decoding lossily"
            );
            Ok(String::from_utf8_lossy(body).into_owned())
        }
    }

    fn value<T: DeserializeOwned>(&self, body: &Bytes) -> Result<T, TransportError> {
        if body.is_empty()
            && let Ok(value) = T::deserialize(UnitDeserializer::<ValueError>::new())
        {
            return Ok(value);
        }

        if self.mode == ResponseMode::Binary {
            return T::deserialize(BytesDeserializer::<ValueError>::new(body))
                .map_err(|e| TransportError::Serialization(format!("binary body: {e}")));
        }

        let text = self.text(body)?;
        if self.is_json() {
            return Ok(serde_json::from_str(&text)?);
        }
        T::deserialize(StrDeserializer::<ValueError>::new(&text))
            .or_else(|_| serde_json::from_str(&text))
            .map_err(TransportError::from)
    }

    /// Non-2xx: a typed API error when the body is JSON that parses as `E`,
    /// otherwise a normalized `SdkError` carrying the status
    fn failure<T, E: DeserializeOwned>(&self, status: StatusCode, body: &Bytes) -> SdkResponse<T, E> {
        let text = match self.mode {
            ResponseMode::Binary => None,
            ResponseMode::String | ResponseMode::Unknown => self.text(body).ok(),
        };

        let Some(text) = text else {
            return SdkResponse::sdk_error(SdkError::new(status.to_string()));
        };

        if let Ok(api) = serde_json::from_str::<E>(&text) {
            return SdkResponse::api_error(api);
        }

        match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(payload) => SdkResponse::sdk_error(sdk_error(&payload)),
            Err(_) if text.is_empty() => SdkResponse::sdk_error(SdkError::new(status.to_string())),
            Err(_) => SdkResponse::sdk_error(SdkError::new(format!("{status}: {text}"))),
        }
    }

    fn is_json(&self) -> bool {
        self.content_type.to_ascii_lowercase().contains("json")
    }
}

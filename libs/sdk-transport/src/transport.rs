use std::future::Future;

use http::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

use crate::auth::Authenticator;
use crate::body::{Body, ByteStream};
use crate::error::TransportError;
use crate::query::{Values, add_query_params};
use crate::request::{HttpMethod, RequestProps};
use crate::response::SdkResponse;
use crate::settings::{APP_ID_HEADER, DEFAULT_MAX_REDIRECTS, TransportOptions, TransportSettings};

/// Description of one API call, as assembled by a generated API method
pub struct ApiCall<'a> {
    method: HttpMethod,
    path: String,
    query: Option<Values>,
    body: Body,
    authenticator: Option<&'a dyn Authenticator>,
    options: Option<TransportOptions>,
}

impl std::fmt::Debug for ApiCall<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCall")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("authenticator", &self.authenticator.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> ApiCall<'a> {
    /// `path` is either relative to `base_url` or an absolute `http(s)://` URL
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: Body::Empty,
            authenticator: None,
            options: None,
        }
    }

    #[must_use]
    pub fn query(mut self, values: Values) -> Self {
        self.query = Some(values);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn authenticator(mut self, authenticator: &'a dyn Authenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    #[must_use]
    pub fn options(mut self, options: TransportOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the call against shared settings and run the authenticator.
    ///
    /// Authentication strictly precedes the returned props being dispatched.
    ///
    /// # Errors
    /// Returns an error if a header is invalid or the authenticator fails.
    pub async fn prepare(self, settings: &TransportSettings) -> Result<PreparedCall, TransportError> {
        let effective = settings.merge(self.options.as_ref());
        let options = self.options.unwrap_or_default();
        let url = make_url(&self.path, &effective, self.query.as_ref());

        let mut headers = to_header_map(&effective.headers)?;
        let agent = HeaderValue::try_from(effective.agent_tag())
            .map_err(|e| TransportError::Build(format!("Invalid agent tag: {e}")))?;
        headers.insert(http::header::USER_AGENT, agent.clone());
        headers.insert(HeaderName::from_static(APP_ID_HEADER), agent);
        if self.body.is_json() && !headers.contains_key(http::header::CONTENT_TYPE) {
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }

        let props = RequestProps {
            method: self.method,
            url,
            headers,
            body: self.body,
            redirect: options.redirect.unwrap_or_default(),
            max_redirects: options.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
            compress: options.compress.unwrap_or(true),
            max_body_size: options.max_body_size,
            timeout: effective.timeout(),
            verify_ssl: effective.verify_ssl,
        };

        let props = match self.authenticator {
            Some(authenticator) => authenticator.authenticate(props).await?,
            None => props,
        };

        Ok(PreparedCall {
            props,
            settings: effective,
        })
    }
}

/// An authenticated call ready for dispatch
#[derive(Debug)]
pub struct PreparedCall {
    pub props: RequestProps,
    /// Effective settings for this call only
    pub settings: TransportSettings,
}

/// The seam between API-call construction and wire I/O.
///
/// Implementations perform the I/O; classification, encoding and error
/// normalization come from this crate so every adapter behaves the same.
pub trait Transport: Send + Sync {
    /// Send a call and fully download and decode the response.
    ///
    /// Expected failures (network, timeout, decode, non-2xx) are returned in
    /// the error arm rather than raised.
    fn request<T, E>(&self, call: ApiCall<'_>) -> impl Future<Output = SdkResponse<T, E>> + Send
    where
        T: DeserializeOwned + Send,
        E: DeserializeOwned + Send;

    /// Send a call and hand the response byte stream to `callback`.
    ///
    /// Returns whatever `callback` produces.
    ///
    /// # Errors
    /// Any failure before the stream is available (build, authentication,
    /// connection, non-2xx status) is returned as an error.
    fn stream<T, F, Fut>(
        &self,
        callback: F,
        call: ApiCall<'_>,
    ) -> impl Future<Output = Result<T, TransportError>> + Send
    where
        T: Send,
        F: FnOnce(ByteStream) -> Fut + Send,
        Fut: Future<Output = T> + Send;
}

/// Build the request URL. Absolute `http(s)://` paths are used as-is,
/// anything else is appended to `base_url`.
pub fn make_url(path: &str, settings: &TransportSettings, query: Option<&Values>) -> String {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    let url = if lower.starts_with("http://") || lower.starts_with("https://") {
        path.to_owned()
    } else {
        let base = settings.base_url.trim_end_matches('/');
        if path.is_empty() || path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    };
    add_query_params(&url, query)
}

fn to_header_map(
    headers: &std::collections::BTreeMap<String, String>,
) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::try_from(name.as_str())
            .map_err(|e| TransportError::Build(format!("Invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_str())
            .map_err(|e| TransportError::Build(format!("Invalid header value: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::body::Body;
use crate::error::TransportError;

/// HTTP verbs the generated API methods use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Trace,
    Head,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "TRACE" => Ok(HttpMethod::Trace),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(TransportError::Build(format!("Unsupported HTTP method: {other}"))),
        }
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Trace => http::Method::TRACE,
            HttpMethod::Head => http::Method::HEAD,
        }
    }
}

/// What to do when the server answers with a redirect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectPolicy {
    /// Follow up to `max_redirects` hops
    #[default]
    Follow,
    /// Return the redirect response to the caller
    Manual,
    /// Treat any redirect as a failure
    Error,
}

/// Fully resolved description of one outgoing call.
///
/// Built fresh per call from the effective settings, then handed to the
/// authenticator (if any) before dispatch.
#[derive(Debug, Clone)]
pub struct RequestProps {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,
    pub redirect: RedirectPolicy,
    pub max_redirects: usize,
    pub compress: bool,
    pub max_body_size: Option<usize>,
    pub timeout: Duration,
    pub verify_ssl: bool,
}

impl RequestProps {
    /// Insert or replace a header
    ///
    /// # Errors
    /// Returns `TransportError::Build` if the name or value is not a valid header.
    pub fn set_header<K, V>(&mut self, key: K, value: V) -> Result<(), TransportError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: fmt::Display,
        V::Error: fmt::Display,
    {
        let key = key
            .try_into()
            .map_err(|e| TransportError::Build(format!("Invalid header name: {e}")))?;
        let value = value
            .try_into()
            .map_err(|e| TransportError::Build(format!("Invalid header value: {e}")))?;
        self.headers.insert(key, value);
        Ok(())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }
}

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::request::RedirectPolicy;

/// Request timeout when neither settings nor options give one
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Redirect hops followed under [`RedirectPolicy::Follow`]
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Header carrying the client agent tag as an application id
pub const APP_ID_HEADER: &str = "x-sdk-appid";

/// Prefix used by [`TransportSettings::from_env`]
pub const ENV_PREFIX: &str = "SDK_";

fn default_verify_ssl() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Shared transport configuration, built once per client.
///
/// Unrecognized keys are kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub base_url: String,
    pub api_version: String,
    /// Default headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Charset override for text responses
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub agent_tag: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl TransportSettings {
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: api_version.into(),
            headers: BTreeMap::new(),
            verify_ssl: default_verify_ssl(),
            timeout: DEFAULT_TIMEOUT_SECS,
            encoding: None,
            agent_tag: None,
            extra: BTreeMap::new(),
        }
    }

    /// Set the default timeout in seconds
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    #[must_use]
    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_agent_tag(mut self, tag: impl Into<String>) -> Self {
        self.agent_tag = Some(tag.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Agent tag sent as `User-Agent`, defaulting to `sdk-transport/<api_version>`
    pub fn agent_tag(&self) -> String {
        self.agent_tag
            .clone()
            .unwrap_or_else(|| format!("sdk-transport/{}", self.api_version))
    }

    /// Create settings from `SDK_*` environment variables
    ///
    /// Expects:
    /// - `SDK_BASE_URL` (required)
    /// - `SDK_API_VERSION` (required)
    /// - `SDK_VERIFY_SSL` (default: `true`)
    /// - `SDK_TIMEOUT` in seconds (default: 120)
    /// - `SDK_ENCODING`, `SDK_AGENT_TAG` (optional)
    ///
    /// # Errors
    /// Returns `TransportError::Config` if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, TransportError> {
        Self::from_env_prefixed(ENV_PREFIX)
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable prefix
    ///
    /// # Errors
    /// Returns `TransportError::Config` if a required variable is missing or a value does not parse.
    pub fn from_env_prefixed(prefix: &str) -> Result<Self, TransportError> {
        let var = |name: &str| std::env::var(format!("{prefix}{name}")).ok();
        let required = |name: &str| {
            var(name).ok_or_else(|| TransportError::Config(format!("{prefix}{name} not set")))
        };

        let mut settings = Self::new(required("BASE_URL")?, required("API_VERSION")?);

        if let Some(raw) = var("VERIFY_SSL") {
            settings.verify_ssl = parse_bool(&raw).ok_or_else(|| {
                TransportError::Config(format!("{prefix}VERIFY_SSL is not a boolean: {raw}"))
            })?;
        }
        if let Some(raw) = var("TIMEOUT") {
            settings.timeout = raw.trim().parse().map_err(|_| {
                TransportError::Config(format!("{prefix}TIMEOUT is not a number of seconds: {raw}"))
            })?;
        }
        settings.encoding = var("ENCODING");
        settings.agent_tag = var("AGENT_TAG");

        Ok(settings)
    }

    /// Effective settings for one call. `self` is left untouched.
    #[must_use]
    pub fn merge(&self, options: Option<&TransportOptions>) -> TransportSettings {
        let mut effective = self.clone();
        let Some(options) = options else {
            return effective;
        };

        if let Some(timeout) = options.timeout {
            effective.timeout = timeout;
        }
        if let Some(verify_ssl) = options.verify_ssl {
            effective.verify_ssl = verify_ssl;
        }
        if let Some(encoding) = &options.encoding {
            effective.encoding = Some(encoding.clone());
        }
        effective
            .headers
            .extend(options.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        effective
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Per-call overrides; unset fields fall back to the shared settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Seconds
    pub timeout: Option<u64>,
    pub verify_ssl: Option<bool>,
    /// Merged over the default headers
    pub headers: BTreeMap<String, String>,
    pub encoding: Option<String>,
    pub redirect: Option<RedirectPolicy>,
    pub max_redirects: Option<usize>,
    pub compress: Option<bool>,
    /// Upper bound on a buffered response body, in bytes
    pub max_body_size: Option<usize>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    #[must_use]
    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = Some(verify_ssl);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn redirect(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = Some(policy);
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = Some(max);
        self
    }

    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = Some(bytes);
        self
    }
}

//! SDK Transport
//!
//! Pluggable HTTP transport contract for generated API client libraries.
//!
//! Generated API methods describe a call (method, path, query values, body,
//! authenticator, per-call options) as an [`ApiCall`] and hand it to any
//! [`Transport`]. The transport moves the bytes; this crate supplies the parts
//! every transport must agree on:
//!
//! - response-mode classification and charset detection ([`ContentTypePatterns`])
//! - query-parameter encoding ([`encode_params`], [`add_query_params`])
//! - the authentication hook ([`Authenticator`], [`AuthSession`])
//! - error normalization into [`SdkError`] and the tagged [`SdkResponse`]
//!
//! [`ReqwestTransport`] is the bundled `reqwest` adapter.
//!
//! # Examples
//!
//! ## Buffered request
//!
//! ```no_run
//! use sdk_transport::{
//!     ApiCall, HttpMethod, ReqwestTransport, SdkResponse, Transport, TransportSettings, Values,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = TransportSettings::new("https://api.example.com/api/4.0", "4.0");
//! let transport = ReqwestTransport::new(settings)?;
//!
//! let call = ApiCall::new(HttpMethod::Get, "/users")
//!     .query(Values::new().with("fields", "id,name"));
//!
//! match transport.request::<serde_json::Value, serde_json::Value>(call).await {
//!     SdkResponse::Success(users) => println!("{users}"),
//!     SdkResponse::Failure(err) => eprintln!("{err}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Authenticated streaming
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::TryStreamExt;
//! use sdk_transport::{
//!     ApiCall, BearerTokenSession, HttpMethod, ReqwestTransport, SessionAuthenticator,
//!     Transport, TransportSettings,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = ReqwestTransport::new(TransportSettings::from_env()?)?;
//! let auth = SessionAuthenticator::new(Arc::new(BearerTokenSession::new("token")));
//!
//! let call = ApiCall::new(HttpMethod::Get, "/exports/42").authenticator(&auth);
//! let size = transport
//!     .stream(
//!         |stream| async move {
//!             stream
//!                 .try_fold(0usize, |n, chunk| async move { Ok(n + chunk.len()) })
//!                 .await
//!         },
//!         call,
//!     )
//!     .await??;
//! println!("{size} bytes");
//! # Ok(())
//! # }
//! ```

mod auth;
mod body;
mod error;
mod mode;
mod query;
mod reqwest_transport;
mod request;
mod response;
mod settings;
mod status;
mod transport;

// Re-export public API
pub use auth::{AuthSession, AuthToken, Authenticator, BearerTokenSession, SessionAuthenticator};
pub use body::{Body, BoxStream, ByteStream};
pub use error::{SdkError, TransportError, sdk_error};
pub use mode::{
    ContentTypePatterns, MATCH_CHARSET_UTF8, MATCH_MODE_BINARY, MATCH_MODE_STRING, ResponseMode,
};
pub use query::{QueryValue, Values, add_query_params, encode_param, encode_params};
pub use reqwest_transport::ReqwestTransport;
pub use request::{HttpMethod, RedirectPolicy, RequestProps};
pub use response::{ResponseError, SdkResponse, sdk_ok};
pub use settings::{
    APP_ID_HEADER, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_SECS, ENV_PREFIX, TransportOptions,
    TransportSettings,
};
pub use status::StatusCode;
pub use transport::{ApiCall, PreparedCall, Transport, make_url};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};

use crate::error::TransportError;
use crate::request::RequestProps;

/// Decorates outgoing request properties with authentication data.
///
/// Invoked once per call, after the request is built and before it is sent.
/// Implementations may perform I/O (e.g. a login round-trip).
///
/// Any `Fn(RequestProps) -> impl Future<Output = Result<RequestProps, TransportError>>`
/// closure is an `Authenticator`.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    /// Returns an error if the request cannot be authenticated.
    async fn authenticate(&self, props: RequestProps) -> Result<RequestProps, TransportError>;
}

#[async_trait::async_trait]
impl<F, Fut> Authenticator for F
where
    F: Fn(RequestProps) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestProps, TransportError>> + Send + 'static,
{
    async fn authenticate(&self, props: RequestProps) -> Result<RequestProps, TransportError> {
        self(props).await
    }
}

/// Access token issued by a login
#[derive(Debug)]
pub struct AuthToken {
    pub access_token: SecretString,
    pub token_type: String,
    /// Seconds until expiry, when the issuer reports it
    pub expires_in: Option<u64>,
}

impl Clone for AuthToken {
    fn clone(&self) -> Self {
        Self {
            access_token: SecretString::from(self.access_token.expose_secret().to_owned()),
            token_type: self.token_type.clone(),
            expires_in: self.expires_in,
        }
    }
}

impl AuthToken {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            token_type: "Bearer".to_owned(),
            expires_in: None,
        }
    }

    /// `Authorization` header value for this token
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose_secret())
    }
}

/// Owner of login state. The transport only reaches it through
/// [`SessionAuthenticator`]; it never inspects or stores session internals.
#[async_trait::async_trait]
pub trait AuthSession: Send + Sync {
    fn is_authenticated(&self) -> bool;

    /// Decorate request properties, logging in first if needed
    ///
    /// # Errors
    /// Returns an error if login fails or the props cannot be decorated.
    async fn authenticate(&self, props: RequestProps) -> Result<RequestProps, TransportError>;

    /// # Errors
    /// Returns an error if the server-side logout fails.
    async fn logout(&self) -> Result<bool, TransportError>;

    /// # Errors
    /// Returns an error if no token can be obtained.
    async fn get_token(&self) -> Result<AuthToken, TransportError>;

    fn is_sudo(&self) -> bool;

    /// # Errors
    /// Returns an error if the login round-trip fails.
    async fn login(&self, sudo_id: Option<&str>) -> Result<AuthToken, TransportError>;

    /// Forget local state without logging out server-side
    fn reset(&self);
}

/// Adapts a shared [`AuthSession`] into an [`Authenticator`]
pub struct SessionAuthenticator<S: ?Sized> {
    session: Arc<S>,
}

impl<S: AuthSession + ?Sized> SessionAuthenticator<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }
}

#[async_trait::async_trait]
impl<S: AuthSession + ?Sized> Authenticator for SessionAuthenticator<S> {
    async fn authenticate(&self, props: RequestProps) -> Result<RequestProps, TransportError> {
        self.session.authenticate(props).await
    }
}

/// Session backed by a pre-issued bearer token.
///
/// "Login" activates the token locally; no network round-trip is made.
pub struct BearerTokenSession {
    token: AuthToken,
    authenticated: AtomicBool,
    sudo_id: Mutex<Option<String>>,
}

impl BearerTokenSession {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: AuthToken::bearer(access_token),
            authenticated: AtomicBool::new(false),
            sudo_id: Mutex::new(None),
        }
    }

    pub fn sudo_id(&self) -> Option<String> {
        self.sudo_id.lock().clone()
    }
}

impl std::fmt::Debug for BearerTokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerTokenSession")
            .field("authenticated", &self.is_authenticated())
            .field("sudo_id", &self.sudo_id())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl AuthSession for BearerTokenSession {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    async fn authenticate(&self, mut props: RequestProps) -> Result<RequestProps, TransportError> {
        let token = self.get_token().await?;
        props.set_header(http::header::AUTHORIZATION, token.authorization())?;
        Ok(props)
    }

    async fn logout(&self) -> Result<bool, TransportError> {
        let was_authenticated = self.authenticated.swap(false, Ordering::AcqRel);
        *self.sudo_id.lock() = None;
        Ok(was_authenticated)
    }

    async fn get_token(&self) -> Result<AuthToken, TransportError> {
        if self.is_authenticated() {
            Ok(self.token.clone())
        } else {
            self.login(None).await
        }
    }

    fn is_sudo(&self) -> bool {
        self.sudo_id.lock().is_some()
    }

    async fn login(&self, sudo_id: Option<&str>) -> Result<AuthToken, TransportError> {
        if self.token.access_token.expose_secret().is_empty() {
            return Err(TransportError::Auth("no access token configured".into()));
        }
        *self.sudo_id.lock() = sudo_id.map(str::to_owned);
        self.authenticated.store(true, Ordering::Release);
        tracing::debug!(sudo = sudo_id.is_some(), "bearer session activated");
        Ok(self.token.clone())
    }

    fn reset(&self) {
        self.authenticated.store(false, Ordering::Release);
        *self.sudo_id.lock() = None;
    }
}

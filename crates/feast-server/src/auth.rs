//! The authentication gate.
//!
//! Resolution order:
//!
//! 1. each [`AuthResolver`] in registration order; the first principal wins
//! 2. `Authorization: Basic` credentials, checked by the [`CredentialVerifier`]
//! 3. otherwise [`AuthResult::Anonymous`]
//!
//! The gate never enforces per-route access. Handlers that need a caller
//! answer `unauthenticated` themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use feast_core::{ApiError, ApiResult, AuthResult, BoxFuture, Principal, RequestContext};
use http::header::AUTHORIZATION;
use http::HeaderMap;

/// Supplies a principal without credentials, e.g. from a session.
pub trait AuthResolver: Send + Sync {
    /// Returns the caller, or `None` to defer to the next step.
    fn resolve(&self, ctx: &RequestContext) -> Option<Principal>;
}

impl<F> AuthResolver for F
where
    F: Fn(&RequestContext) -> Option<Principal> + Send + Sync,
{
    fn resolve(&self, ctx: &RequestContext) -> Option<Principal> {
        self(ctx)
    }
}

/// Checks a username and password.
pub trait CredentialVerifier: Send + Sync {
    /// Resolves the credentials to a principal or a rejection.
    fn verify(&self, username: &str, password: &str) -> BoxFuture<'static, ApiResult<Principal>>;
}

/// Username and password from a Basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// Login name.
    pub username: String,
    /// Password.
    pub password: String,
}

impl BasicCredentials {
    /// Parses a header value such as `Basic YWRtaW46cHc=`.
    ///
    /// Returns `None` for other schemes, bad base64, non UTF-8 text or a
    /// missing `:`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let text = String::from_utf8(decoded).ok()?;
        let (username, password) = text.split_once(':')?;
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Reads credentials from request headers.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
    }

    /// Encodes a header value. Used by clients and tests.
    #[must_use]
    pub fn header_value(username: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
struct StaticUser {
    password: String,
    roles: Vec<String>,
}

/// A fixed set of users, usually loaded from configuration.
///
/// ```rust
/// use feast_server::{CredentialVerifier, StaticCredentials};
///
/// # tokio_test::block_on(async {
/// let users = StaticCredentials::new().with_user("admin", "pw", ["administrator"]);
/// let admin = users.verify("admin", "pw").await.unwrap();
/// assert!(admin.has_role("administrator"));
/// assert!(users.verify("admin", "nope").await.is_err());
/// # });
/// ```
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, StaticUser>,
}

impl StaticCredentials {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user.
    #[must_use]
    pub fn with_user<I, S>(mut self, username: &str, password: &str, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.users.insert(
            username.to_string(),
            StaticUser {
                password: password.to_string(),
                roles: roles.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// Number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if no users are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn check(&self, username: &str, password: &str) -> ApiResult<Principal> {
        match self.users.get(username) {
            Some(user) if user.password == password => {
                Ok(Principal::new(username, username).with_roles(user.roles.iter().cloned()))
            }
            _ => Err(ApiError::invalid_credentials()),
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> BoxFuture<'static, ApiResult<Principal>> {
        let outcome = self.check(username, password);
        Box::pin(async move { outcome })
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.users.keys().collect();
        names.sort();
        f.debug_struct("StaticCredentials")
            .field("users", &names)
            .finish()
    }
}

/// Resolver chain plus an optional credential verifier.
#[derive(Clone, Default)]
pub struct AuthGate {
    resolvers: Vec<Arc<dyn AuthResolver>>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
}

impl AuthGate {
    /// A gate with no resolvers and no verifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver to the chain.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl AuthResolver + 'static) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Sets the credential verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: impl CredentialVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Resolves the caller of `ctx`.
    pub async fn authenticate(&self, ctx: &RequestContext) -> AuthResult {
        if let Some(principal) = self.resolvers.iter().find_map(|r| r.resolve(ctx)) {
            return AuthResult::Authenticated(principal);
        }

        let Some(credentials) = BasicCredentials::from_headers(ctx.headers()) else {
            return AuthResult::Anonymous;
        };

        let Some(verifier) = &self.verifier else {
            tracing::debug!("basic credentials supplied but no verifier configured");
            return AuthResult::Failed(ApiError::unauthenticated());
        };

        match verifier
            .verify(&credentials.username, &credentials.password)
            .await
        {
            Ok(principal) => AuthResult::Authenticated(principal),
            Err(err) => {
                tracing::debug!(
                    username = %credentials.username,
                    error_code = err.code(),
                    "credential verification failed"
                );
                AuthResult::Failed(err)
            }
        }
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("resolvers", &self.resolvers.len())
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}

//! Caller identity and the authentication outcome.

use serde::{Deserialize, Serialize};

use crate::ApiError;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    name: String,
    #[serde(default)]
    roles: Vec<String>,
}

impl Principal {
    /// Creates a principal with no roles.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roles: Vec::new(),
        }
    }

    /// Adds roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Stable identifier, used as the key for per-user state.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Login name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Granted roles.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns true when `role` was granted.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Identifier safe to put in logs.
    #[must_use]
    pub fn log_id(&self) -> String {
        format!("user:{}", self.id)
    }
}

/// Outcome of the authentication gate.
///
/// `Anonymous` is not a failure. Handlers that need a caller check for one
/// themselves and answer `unauthenticated`.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    /// A resolver or the credential verifier produced a caller.
    Authenticated(Principal),
    /// Credentials were supplied and rejected. Routing is skipped.
    Failed(ApiError),
    /// No credentials at all.
    Anonymous,
}

impl AuthResult {
    /// The caller, when authenticated.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    /// Returns true for [`AuthResult::Failed`].
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Label for logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Authenticated(_) => "authenticated",
            Self::Failed(_) => "failed",
            Self::Anonymous => "anonymous",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_roles() {
        let p = Principal::new("7", "editor").with_roles(["editor", "reader"]);
        assert!(p.has_role("reader"));
        assert!(!p.has_role("admin"));
        assert_eq!(p.log_id(), "user:7");
    }

    #[test]
    fn test_auth_result_accessors() {
        let ok = AuthResult::Authenticated(Principal::new("1", "a"));
        assert_eq!(ok.principal().map(Principal::id), Some("1"));
        assert_eq!(ok.kind(), "authenticated");

        let failed = AuthResult::Failed(ApiError::invalid_credentials());
        assert!(failed.is_failed());
        assert!(failed.principal().is_none());

        assert_eq!(AuthResult::Anonymous.kind(), "anonymous");
    }
}

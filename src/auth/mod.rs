//! Delegated identity
//!
//! Owners sign in with a managed auth service; this crate only verifies the
//! bearer tokens it issues. Sign-up, sign-in and token refresh stay with
//! that service.

mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use remote::RemoteAuthProvider;

/// Identity behind a verified access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque user id; boards store it as `owner_id`
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Auth request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Auth service responded with status {0}")]
    UnexpectedStatus(u16),
}

/// Verifies access tokens
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` for a token the service does not accept
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError>;
}

/// Fixed token table, for tests and local development
#[derive(Debug, Default)]
pub struct StaticAuthProvider {
    users: HashMap<String, AuthUser>,
}

impl StaticAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        self.users.insert(
            token.into(),
            AuthUser {
                email: Some(format!("{}@example.com", id)),
                id,
            },
        );
        self
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        Ok(self.users.get(token).cloned())
    }
}

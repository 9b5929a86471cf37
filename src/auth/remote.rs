//! Token verification against the managed auth endpoint

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::StatusCode;
use std::time::Duration;

use super::{AuthError, AuthProvider, AuthUser};
use crate::config::AuthConfig;

/// Calls `GET {url}/user` with the caller's token and caches accepted tokens
pub struct RemoteAuthProvider {
    client: reqwest::Client,
    user_url: String,
    api_key: String,
    verified: Cache<String, AuthUser>,
}

impl RemoteAuthProvider {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .user_agent("Feedboard-Auth")
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        let verified = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Ok(Self {
            client,
            user_url: format!("{}/user", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            verified,
        })
    }

    async fn fetch_user(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .client
            .get(&self.user_url)
            .bearer_auth(token)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<AuthUser>().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(AuthError::UnexpectedStatus(status.as_u16())),
        }
    }
}

/// Tokens are never kept in memory as-is
fn cache_key(token: &str) -> String {
    format!("{:x}", md5::compute(token.as_bytes()))
}

#[async_trait]
impl AuthProvider for RemoteAuthProvider {
    async fn verify(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let key = cache_key(token);
        if let Some(user) = self.verified.get(&key).await {
            return Ok(Some(user));
        }

        let user = self.fetch_user(token).await?;
        match &user {
            Some(user) => self.verified.insert(key, user.clone()).await,
            None => tracing::debug!("Auth service rejected token"),
        }
        Ok(user)
    }
}

//! Identity resolution against the external auth provider.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::{AnalysisError, Result};
use crate::models::Identity;

/// Resolves the user behind a bearer token.
///
/// `Ok(None)` means the request carries no resolvable identity (missing,
/// expired, or unknown token). `Err` means the provider itself could not be
/// consulted, which is a different failure than a rejected token.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self, token: Option<&str>) -> Result<Option<Identity>>;
}

/// Resolves identities against an OAuth userinfo endpoint.
pub struct OidcUserinfoProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

#[derive(Deserialize)]
struct UserinfoClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

impl OidcUserinfoProvider {
    pub fn new(userinfo_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            userinfo_url: userinfo_url.into(),
        }
    }

    /// Build the provider from `AUTH_USERINFO_URL`.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("AUTH_USERINFO_URL")
            .map_err(|_| AnalysisError::Configuration("AUTH_USERINFO_URL is not set".to_string()))?;
        Ok(Self::new(url))
    }
}

#[async_trait]
impl IdentityProvider for OidcUserinfoProvider {
    async fn current_user(&self, token: Option<&str>) -> Result<Option<Identity>> {
        let Some(token) = token else {
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.userinfo_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                AnalysisError::Upstream(format!("identity provider request failed: {e}"))
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AnalysisError::Upstream(format!(
                "identity provider returned {status}"
            )));
        }

        let claims: UserinfoClaims = response.json().await.map_err(|e| {
            AnalysisError::Upstream(format!("identity provider response unreadable: {e}"))
        })?;

        Ok(Some(Identity {
            user_id: claims.sub,
            email: claims.email,
        }))
    }
}

/// Static token table for tests and local development.
pub struct StaticTokenProvider {
    tokens: DashMap<String, Identity>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
        }
    }

    pub fn insert(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(token.into(), identity);
    }
}

impl Default for StaticTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn current_user(&self, token: Option<&str>) -> Result<Option<Identity>> {
        Ok(token.and_then(|t| self.tokens.get(t).map(|entry| entry.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_user() -> StaticTokenProvider {
        let provider = StaticTokenProvider::new();
        provider.insert(
            "valid-token",
            Identity {
                user_id: "user-1".to_string(),
                email: Some("tenant@example.com".to_string()),
            },
        );
        provider
    }

    #[tokio::test]
    async fn known_token_resolves_to_its_identity() {
        let provider = provider_with_user();
        let identity = provider
            .current_user(Some("valid-token"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.user_id, "user-1");
        assert_eq!(identity.email.as_deref(), Some("tenant@example.com"));
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let provider = provider_with_user();
        assert!(provider.current_user(Some("bogus")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_token_resolves_to_none() {
        let provider = provider_with_user();
        assert!(provider.current_user(None).await.unwrap().is_none());
    }
}

use crate::http::build_client;
use crate::spapi::config::LwaCredentials;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("missing LWA credentials in env")]
    MissingCredentials,
    #[error("token request failed: {0}")]
    Request(String),
}

/// Supplies an access token for each authenticated SP-API request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, TokenError>;
}

/// A fixed token. Fine for short workflows and tests.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, TokenError> {
        if self.0.is_empty() {
            return Err(TokenError::MissingCredentials);
        }
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Login with Amazon refresh-token grant, cached until shortly before expiry.
pub struct LwaTokenProvider {
    http: Client,
    credentials: LwaCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl LwaTokenProvider {
    pub fn new(credentials: LwaCredentials) -> Result<Self, TokenError> {
        if !credentials.is_complete() {
            return Err(TokenError::MissingCredentials);
        }
        Ok(Self {
            http: build_client(),
            credentials,
            cached: Mutex::new(None),
        })
    }

    async fn request_token(&self) -> Result<TokenResponse, TokenError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let response = self
            .http
            .post(&self.credentials.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|err| TokenError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Request(format!("HTTP {status}: {body}")));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|err| TokenError::Request(err.to_string()))
    }
}

#[async_trait]
impl TokenSource for LwaTokenProvider {
    async fn access_token(&self) -> Result<String, TokenError> {
        let mut guard = self.cached.lock().await;
        if let Some(cached) = guard.as_ref()
            && Instant::now() < cached.refresh_at
        {
            return Ok(cached.value.clone());
        }

        let fresh = self.request_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        debug!(
            target = "spapi.auth",
            expires_in = lifetime.as_secs(),
            "refreshed LWA access token"
        );
        *guard = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at,
        });
        Ok(fresh.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_verbatim() {
        let source = StaticToken::new("Atza|token");
        assert_eq!(source.access_token().await.unwrap(), "Atza|token");
    }

    #[tokio::test]
    async fn empty_static_token_is_rejected() {
        let source = StaticToken::new("");
        assert!(matches!(
            source.access_token().await,
            Err(TokenError::MissingCredentials)
        ));
    }

    #[test]
    fn lwa_provider_requires_complete_credentials() {
        let creds = LwaCredentials {
            client_id: "id".into(),
            ..LwaCredentials::default()
        };
        assert!(matches!(
            LwaTokenProvider::new(creds),
            Err(TokenError::MissingCredentials)
        ));
    }
}

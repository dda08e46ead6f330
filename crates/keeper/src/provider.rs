// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity-provider token endpoint client.
//!
//! Only the request/response contract of the token endpoint matters here:
//! form-encoded `POST` with the app credentials and a grant, JSON back.
//! Calls are never retried at this level; the bulk pass makes at most one
//! attempt per tenant.

use std::fmt;
use std::sync::Once;
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call more than once; only the first call has effect.
pub fn install_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Token payload returned by the provider for either grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData {
    pub access_token: String,
    /// May rotate on every refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, rename = "locationId", skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, rename = "companyId", skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(default, rename = "userType", skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    /// Any other provider-specific fields.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenData {
    /// Tenant the token was issued for: the location, else the company.
    pub fn tenant_id(&self) -> Option<&str> {
        self.location_id.as_deref().or(self.company_id.as_deref()).filter(|id| !id.is_empty())
    }
}

/// Failure talking to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Connection, TLS, or timeout failure before a response arrived.
    Transport(String),
    /// Non-2xx response, kept verbatim for diagnosis.
    Status { status: u16, body: String },
    /// 2xx response that is not a usable token payload.
    Decode(String),
}

impl ProviderError {
    /// HTTP status from the provider, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "token endpoint unreachable: {msg}"),
            Self::Status { status, body } => write!(f, "token endpoint returned {status}: {body}"),
            Self::Decode(msg) => write!(f, "invalid token response: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Token exchange against the identity provider.
///
/// Object-safe for use as `Arc<dyn TokenExchange>`.
pub trait TokenExchange: Send + Sync {
    /// Exchange a refresh token for a new token set (`refresh_token` grant).
    fn refresh<'a>(
        &'a self,
        tenant_id: &'a str,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenData, ProviderError>>;

    /// Exchange an authorization code from the install flow.
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenData, ProviderError>>;
}

/// Static settings for [`HttpTokenExchange`].
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub user_type: String,
    pub timeout: Duration,
}

/// [`TokenExchange`] over HTTP.
pub struct HttpTokenExchange {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl HttpTokenExchange {
    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        install_crypto_provider();
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    async fn post_form(&self, params: &[(&str, &str)]) -> Result<TokenData, ProviderError> {
        let resp = self
            .http
            .post(&self.settings.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ProviderError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(ProviderError::Status { status: status.as_u16(), body });
        }

        let token: TokenData =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(ProviderError::Decode("empty access_token".to_owned()));
        }
        Ok(token)
    }
}

impl TokenExchange for HttpTokenExchange {
    fn refresh<'a>(
        &'a self,
        tenant_id: &'a str,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenData, ProviderError>> {
        Box::pin(async move {
            tracing::debug!(tenant_id, "requesting token refresh");
            self.post_form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await
        })
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenData, ProviderError>> {
        Box::pin(async move {
            let mut params = vec![
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("user_type", self.settings.user_type.as_str()),
            ];
            if let Some(ref uri) = self.settings.redirect_uri {
                params.push(("redirect_uri", uri.as_str()));
            }
            self.post_form(&params).await
        })
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;

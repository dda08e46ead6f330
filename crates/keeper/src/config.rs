// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::credential::expiry::DEFAULT_BUFFER_MINUTES;
use crate::provider::ProviderSettings;
use crate::scheduler::{DEFAULT_FALLBACK_RETRY_MINUTES, MAX_FALLBACK_RETRY_MINUTES};

/// OAuth credential keeper for multi-tenant integrations.
#[derive(Debug, Clone, Parser)]
#[command(name = "tokenkeeper", version, about)]
pub struct Config {
    /// Host address to bind to.
    #[arg(long, env = "TOKENKEEPER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP port to listen on.
    #[arg(long, env = "TOKENKEEPER_PORT", default_value_t = 9810)]
    pub port: u16,

    /// Bearer token for API authentication.
    #[arg(long, env = "TOKENKEEPER_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// JSON file backing the credential store. In-memory when unset.
    #[arg(long, env = "TOKENKEEPER_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Identity-provider token endpoint.
    #[arg(long, env = "TOKENKEEPER_TOKEN_URL")]
    pub token_url: String,

    /// OAuth app client ID.
    #[arg(long, env = "TOKENKEEPER_CLIENT_ID")]
    pub client_id: String,

    /// OAuth app client secret.
    #[arg(long, env = "TOKENKEEPER_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Redirect URI registered for the install flow.
    #[arg(long, env = "TOKENKEEPER_REDIRECT_URI")]
    pub redirect_uri: Option<String>,

    /// `user_type` sent with authorization-code exchanges.
    #[arg(long, env = "TOKENKEEPER_USER_TYPE", default_value = "Location")]
    pub user_type: String,

    /// Renew credentials expiring within this many minutes.
    #[arg(long, env = "TOKENKEEPER_BUFFER_MINUTES", default_value_t = DEFAULT_BUFFER_MINUTES)]
    pub buffer_minutes: u64,

    /// Retry delay when the next pass cannot be planned.
    #[arg(
        long,
        env = "TOKENKEEPER_FALLBACK_RETRY_MINUTES",
        default_value_t = DEFAULT_FALLBACK_RETRY_MINUTES
    )]
    pub fallback_retry_minutes: u64,

    /// Maximum tenants renewed in parallel during one pass.
    #[arg(long, env = "TOKENKEEPER_MAX_CONCURRENT_REFRESHES", default_value_t = 4)]
    pub max_concurrent_refreshes: usize,

    /// Timeout for token endpoint requests, in seconds.
    #[arg(long, env = "TOKENKEEPER_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Do not start the adaptive scheduler at boot.
    #[arg(long, env = "TOKENKEEPER_NO_SCHEDULER")]
    pub no_scheduler: bool,

    /// Log format (json or text).
    #[arg(long, env = "TOKENKEEPER_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "TOKENKEEPER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.token_url.trim().is_empty() {
            anyhow::bail!("--token-url must not be empty");
        }
        if !self.token_url.starts_with("http://") && !self.token_url.starts_with("https://") {
            anyhow::bail!("--token-url must be an http(s) URL: {}", self.token_url);
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            anyhow::bail!("--client-id and --client-secret are required");
        }
        if self.fallback_retry_minutes == 0 {
            anyhow::bail!("--fallback-retry-minutes must be at least 1");
        }
        if self.fallback_retry_minutes > MAX_FALLBACK_RETRY_MINUTES {
            anyhow::bail!(
                "--fallback-retry-minutes must be at most {MAX_FALLBACK_RETRY_MINUTES} (7 days)"
            );
        }
        if self.max_concurrent_refreshes == 0 {
            anyhow::bail!("--max-concurrent-refreshes must be at least 1");
        }
        if self.http_timeout_secs == 0 {
            anyhow::bail!("--http-timeout-secs must be at least 1");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        if self.auth_token.as_deref().is_some_and(str::is_empty) {
            anyhow::bail!("--auth-token must not be empty when set");
        }
        Ok(())
    }

    pub fn fallback_retry(&self) -> Duration {
        Duration::from_secs(self.fallback_retry_minutes.saturating_mul(60))
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            user_type: self.user_type.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    /// Minimal valid config for tests.
    #[doc(hidden)]
    pub fn test(token_url: &str) -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            auth_token: None,
            store_path: None,
            token_url: token_url.into(),
            client_id: "test-client".into(),
            client_secret: "test-secret".into(),
            redirect_uri: None,
            user_type: "Location".into(),
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            fallback_retry_minutes: DEFAULT_FALLBACK_RETRY_MINUTES,
            max_concurrent_refreshes: 4,
            http_timeout_secs: 5,
            no_scheduler: true,
            log_format: "text".into(),
            log_level: "debug".into(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::Config;

const REQUIRED: [&str; 7] = [
    "tokenkeeper",
    "--token-url",
    "https://idp.example/oauth/token",
    "--client-id",
    "cid",
    "--client-secret",
    "secret",
];

fn parse(extra: &[&str]) -> anyhow::Result<Config> {
    let args: Vec<&str> = REQUIRED.iter().chain(extra).copied().collect();
    Ok(Config::try_parse_from(args)?)
}

#[test]
fn defaults_are_applied() -> anyhow::Result<()> {
    let config = parse(&[])?;
    config.validate()?;
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 9810);
    assert_eq!(config.buffer_minutes, 10);
    assert_eq!(config.fallback_retry(), Duration::from_secs(30 * 60));
    assert_eq!(config.max_concurrent_refreshes, 4);
    assert_eq!(config.user_type, "Location");
    assert_eq!(config.log_format, "json");
    assert!(!config.no_scheduler);
    assert!(config.store_path.is_none());
    Ok(())
}

#[test]
fn provider_settings_mirror_flags() -> anyhow::Result<()> {
    let config = parse(&["--redirect-uri", "https://app/cb", "--http-timeout-secs", "7"])?;
    let settings = config.provider_settings();
    assert_eq!(settings.token_url, "https://idp.example/oauth/token");
    assert_eq!(settings.client_id, "cid");
    assert_eq!(settings.client_secret, "secret");
    assert_eq!(settings.redirect_uri.as_deref(), Some("https://app/cb"));
    assert_eq!(settings.timeout, Duration::from_secs(7));
    Ok(())
}

#[test]
fn missing_client_secret_fails_to_parse() {
    let result = Config::try_parse_from([
        "tokenkeeper",
        "--token-url",
        "https://idp.example/token",
        "--client-id",
        "cid",
    ]);
    assert!(result.is_err());
}

#[yare::parameterized(
    zero_fallback     = { &["--fallback-retry-minutes", "0"], "fallback-retry-minutes" },
    week_plus_one     = { &["--fallback-retry-minutes", "10081"], "at most 10080" },
    huge_fallback     = { &["--fallback-retry-minutes", "614891469123651720"], "at most 10080" },
    zero_concurrency  = { &["--max-concurrent-refreshes", "0"], "max-concurrent-refreshes" },
    zero_timeout      = { &["--http-timeout-secs", "0"], "http-timeout-secs" },
    bad_log_format    = { &["--log-format", "xml"], "invalid log format" },
    empty_auth_token  = { &["--auth-token", ""], "auth-token" },
)]
fn invalid_values_are_rejected(extra: &[&str], expected: &str) -> anyhow::Result<()> {
    let config = parse(extra)?;
    crate::assert_err_contains!(config.validate(), expected);
    Ok(())
}

#[test]
fn non_http_token_url_is_rejected() -> anyhow::Result<()> {
    let config = Config::try_parse_from([
        "tokenkeeper",
        "--token-url",
        "ftp://idp.example/token",
        "--client-id",
        "cid",
        "--client-secret",
        "s",
    ])?;
    crate::assert_err_contains!(config.validate(), "http(s) URL");
    Ok(())
}

#[test]
fn test_config_is_valid() -> anyhow::Result<()> {
    Config::test("http://127.0.0.1:1/token").validate()
}

#[test]
fn fallback_bound_is_inclusive() -> anyhow::Result<()> {
    let mut config = Config::test("http://127.0.0.1:1/token");
    config.fallback_retry_minutes = 7 * 24 * 60;
    config.validate()?;
    assert_eq!(config.fallback_retry(), Duration::from_secs(7 * 86_400));
    Ok(())
}

#[test]
fn fallback_retry_saturates_instead_of_overflowing() {
    let mut config = Config::test("http://127.0.0.1:1/token");
    config.fallback_retry_minutes = u64::MAX / 30;
    assert!(config.validate().is_err());
    assert_eq!(config.fallback_retry(), Duration::from_secs(u64::MAX));
}

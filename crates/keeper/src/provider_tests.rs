// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::{provider_settings, token_body, MockIdp};

#[tokio::test]
async fn refresh_posts_form_and_parses_token() -> anyhow::Result<()> {
    let mut body = token_body("new-access", Some("new-refresh"), 86399);
    if let Some(map) = body.as_object_mut() {
        map.insert("locationId".to_owned(), "loc-1".into());
        map.insert("hashedCompanyId".to_owned(), "h".into());
    }
    let idp = MockIdp::start([("old-refresh", 200, body)]).await?;
    let exchange = HttpTokenExchange::new(provider_settings(&idp.token_url()))?;

    let token = exchange.refresh("loc-1", "old-refresh").await?;
    assert_eq!(token.access_token, "new-access");
    assert_eq!(token.refresh_token.as_deref(), Some("new-refresh"));
    assert_eq!(token.expires_in, 86399);
    assert_eq!(token.tenant_id(), Some("loc-1"));
    assert_eq!(token.extra.get("hashedCompanyId"), Some(&serde_json::json!("h")));

    let requests = idp.requests();
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form.get("grant_type").map(String::as_str), Some("refresh_token"));
    assert_eq!(form.get("refresh_token").map(String::as_str), Some("old-refresh"));
    assert_eq!(form.get("client_id").map(String::as_str), Some("test-client"));
    assert_eq!(form.get("client_secret").map(String::as_str), Some("test-secret"));
    Ok(())
}

#[tokio::test]
async fn non_success_status_keeps_body() -> anyhow::Result<()> {
    let idp = MockIdp::start([]).await?;
    let exchange = HttpTokenExchange::new(provider_settings(&idp.token_url()))?;

    let err = exchange.refresh("loc", "revoked").await;
    match err {
        Err(ProviderError::Status { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"), "{body}");
        }
        other => anyhow::bail!("expected status error, got {other:?}"),
    }
    assert_eq!(idp.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn server_error_is_a_status_error() -> anyhow::Result<()> {
    let idp = MockIdp::start([("rt", 503, serde_json::json!({"error": "down"}))]).await?;
    let exchange = HttpTokenExchange::new(provider_settings(&idp.token_url()))?;

    let err = exchange.refresh("loc", "rt").await;
    assert_eq!(err.as_ref().err().and_then(ProviderError::status), Some(503));
    Ok(())
}

#[tokio::test]
async fn response_without_expiry_is_a_decode_error() -> anyhow::Result<()> {
    let body = serde_json::json!({ "access_token": "a", "refresh_token": "r" });
    let idp = MockIdp::start([("rt", 200, body)]).await?;
    let exchange = HttpTokenExchange::new(provider_settings(&idp.token_url()))?;

    let err = exchange.refresh("loc", "rt").await;
    assert!(matches!(err, Err(ProviderError::Decode(_))), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn empty_access_token_is_rejected() -> anyhow::Result<()> {
    let idp = MockIdp::start([("rt", 200, token_body("", Some("r"), 60))]).await?;
    let exchange = HttpTokenExchange::new(provider_settings(&idp.token_url()))?;
    crate::assert_err_contains!(exchange.refresh("loc", "rt").await, "empty access_token");
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() -> anyhow::Result<()> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    drop(listener);

    let exchange = HttpTokenExchange::new(provider_settings(&format!("http://{addr}/token")))?;
    let err = exchange.refresh("loc", "rt").await;
    assert!(matches!(err, Err(ProviderError::Transport(_))), "{err:?}");
    Ok(())
}

#[tokio::test]
async fn exchange_code_sends_authorization_grant() -> anyhow::Result<()> {
    let idp = MockIdp::start([("auth-code", 200, token_body("a", Some("r"), 86399))]).await?;
    let mut settings = provider_settings(&idp.token_url());
    settings.redirect_uri = Some("https://app.example/callback".to_owned());
    let exchange = HttpTokenExchange::new(settings)?;

    exchange.exchange_code("auth-code").await?;

    let requests = idp.requests();
    let form = &requests[0];
    assert_eq!(form.get("grant_type").map(String::as_str), Some("authorization_code"));
    assert_eq!(form.get("code").map(String::as_str), Some("auth-code"));
    assert_eq!(form.get("user_type").map(String::as_str), Some("Location"));
    assert_eq!(
        form.get("redirect_uri").map(String::as_str),
        Some("https://app.example/callback")
    );
    Ok(())
}

#[test]
fn tenant_id_falls_back_to_company() -> anyhow::Result<()> {
    let token: TokenData = serde_json::from_value(serde_json::json!({
        "access_token": "a",
        "expires_in": 10,
        "companyId": "co-1",
    }))?;
    assert_eq!(token.tenant_id(), Some("co-1"));
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: builders, mocks, and assertion helpers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Form, Json, Router};
use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::credential::Credential;
use crate::provider::{ProviderError, ProviderSettings, TokenData, TokenExchange};
use crate::store::CredentialStore;

/// Assert that a `Result` is `Err` and its message contains a substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}

/// Credential for `tenant_id` with a deterministic access token.
pub fn credential(tenant_id: &str, refresh: Option<&str>, expires_at: Option<u64>) -> Credential {
    Credential {
        tenant_id: tenant_id.to_owned(),
        access_token: format!("access-{tenant_id}"),
        refresh_token: refresh.map(str::to_owned),
        issued_at: None,
        lifetime_secs: None,
        expires_at,
        token_type: None,
        scope: None,
        metadata: serde_json::Map::new(),
    }
}

/// Token endpoint success body.
pub fn token_body(access: &str, refresh: Option<&str>, expires_in: u64) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": expires_in,
    });
    if let (Some(refresh), Some(map)) = (refresh, body.as_object_mut()) {
        map.insert("refresh_token".to_owned(), refresh.into());
    }
    body
}

/// Token data as a provider would return it.
pub fn token_data(access: &str, refresh: Option<&str>, expires_in: u64) -> TokenData {
    TokenData {
        access_token: access.to_owned(),
        refresh_token: refresh.map(str::to_owned),
        expires_in,
        token_type: Some("Bearer".to_owned()),
        scope: None,
        location_id: None,
        company_id: None,
        user_type: None,
        extra: serde_json::Map::new(),
    }
}

/// Provider settings pointing at `token_url` with fixed test app credentials.
pub fn provider_settings(token_url: &str) -> ProviderSettings {
    ProviderSettings {
        token_url: token_url.to_owned(),
        client_id: "test-client".to_owned(),
        client_secret: "test-secret".to_owned(),
        redirect_uri: None,
        user_type: "Location".to_owned(),
        timeout: Duration::from_secs(5),
    }
}

#[derive(Default)]
struct IdpState {
    responses: HashMap<String, (u16, serde_json::Value)>,
    requests: Mutex<Vec<HashMap<String, String>>>,
    calls: AtomicU32,
}

/// Mock OAuth token endpoint on a random local port.
///
/// Responses are keyed by the `refresh_token` (or `code`) form field. Unknown
/// grants get `400 invalid_grant`.
pub struct MockIdp {
    addr: SocketAddr,
    state: Arc<IdpState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockIdp {
    pub async fn start(
        responses: impl IntoIterator<Item = (&'static str, u16, serde_json::Value)>,
    ) -> anyhow::Result<Self> {
        let state = Arc::new(IdpState {
            responses: responses
                .into_iter()
                .map(|(key, status, body)| (key.to_owned(), (status, body)))
                .collect(),
            ..Default::default()
        });

        let app = Router::new()
            .route("/oauth/token", post(token_endpoint))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, state, handle })
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/oauth/token", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.state.calls.load(Ordering::Relaxed)
    }

    /// Form bodies received so far, in arrival order.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.state.requests.lock().clone()
    }
}

impl Drop for MockIdp {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn token_endpoint(
    State(state): State<Arc<IdpState>>,
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    state.calls.fetch_add(1, Ordering::Relaxed);
    let key = form.get("refresh_token").or_else(|| form.get("code")).cloned().unwrap_or_default();
    state.requests.lock().push(form);

    match state.responses.get(&key) {
        Some((status, body)) => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(body.clone()),
        ),
        None => (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": "invalid_grant" }))),
    }
}

/// In-process [`TokenExchange`] with canned results keyed by refresh token or code.
#[derive(Default)]
pub struct StubExchange {
    responses: HashMap<String, Result<TokenData, ProviderError>>,
    delay: Option<Duration>,
    calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
}

impl StubExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, result: Result<TokenData, ProviderError>) -> Self {
        self.responses.insert(key.to_owned(), result);
        self
    }

    /// Sleep this long inside every exchange.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Most exchanges ever in flight at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, key: &str) -> Result<TokenData, ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses.get(key).cloned().unwrap_or_else(|| {
            Err(ProviderError::Status {
                status: 400,
                body: r#"{"error":"invalid_grant"}"#.to_owned(),
            })
        })
    }
}

impl TokenExchange for StubExchange {
    fn refresh<'a>(
        &'a self,
        _tenant_id: &'a str,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, Result<TokenData, ProviderError>> {
        Box::pin(self.respond(refresh_token))
    }

    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, Result<TokenData, ProviderError>> {
        Box::pin(self.respond(code))
    }
}

/// Store whose every operation fails, as if the backing storage were down.
pub struct UnavailableStore;

impl CredentialStore for UnavailableStore {
    fn list_refreshable(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>> {
        unavailable()
    }

    fn list_all(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>> {
        unavailable()
    }

    fn find<'a>(&'a self, _tenant_id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<Credential>>> {
        unavailable()
    }

    fn replace_credential(&self, _credential: Credential) -> BoxFuture<'_, anyhow::Result<()>> {
        unavailable()
    }

    fn upsert(&self, _credential: Credential) -> BoxFuture<'_, anyhow::Result<()>> {
        unavailable()
    }
}

fn unavailable<T: Send + 'static>() -> BoxFuture<'static, anyhow::Result<T>> {
    Box::pin(async { Err(anyhow::anyhow!("store unavailable")) })
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the operator API.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::credential::status::{tenant_status, StatusCounts, TenantStatus};
use crate::credential::{epoch_secs, Credential};
use crate::error::ErrorCode;
use crate::refresh::{RefreshError, RefreshStats};
use crate::scheduler::SchedulerStatus;
use crate::state::AppState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub tenants: usize,
    pub scheduler_running: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub optimal_interval_minutes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantRefreshResponse {
    pub tenant_id: String,
    pub refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PassResponse {
    pub pass_id: String,
    #[serde(flatten)]
    pub stats: RefreshStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SchedulerToggleResponse {
    /// Whether the call changed the scheduler state.
    pub changed: bool,
    #[serde(flatten)]
    pub status: SchedulerStatus,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub tenant_id: String,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

fn internal(err: anyhow::Error) -> Response {
    tracing::error!(err = %format!("{err:#}"), "request failed");
    ErrorCode::Internal.to_http_response(format!("{err:#}")).into_response()
}

async fn all_statuses(s: &AppState) -> anyhow::Result<Vec<TenantStatus>> {
    let now = epoch_secs();
    let credentials = s.store.list_all().await?;
    Ok(credentials.iter().map(|c| tenant_status(c, s.buffer_minutes, now)).collect())
}

// -- Handlers -----------------------------------------------------------------

/// `GET /api/v1/health`
pub async fn health(State(s): State<Arc<AppState>>) -> Response {
    let tenants = match s.store.list_all().await {
        Ok(all) => all.len(),
        Err(e) => return internal(e),
    };
    Json(HealthResponse {
        status: "running".to_owned(),
        tenants,
        scheduler_running: s.scheduler.status().running,
    })
    .into_response()
}

/// `GET /api/v1/tokens`
pub async fn list_tokens(State(s): State<Arc<AppState>>) -> Response {
    match all_statuses(&s).await {
        Ok(statuses) => Json(statuses).into_response(),
        Err(e) => internal(e),
    }
}

/// `GET /api/v1/tokens/summary`
pub async fn tokens_summary(State(s): State<Arc<AppState>>) -> Response {
    let statuses = match all_statuses(&s).await {
        Ok(statuses) => statuses,
        Err(e) => return internal(e),
    };
    let optimal_interval_minutes = match s.scheduler.planned_interval_minutes().await {
        Ok(minutes) => minutes,
        Err(e) => return internal(e),
    };
    Json(SummaryResponse { counts: StatusCounts::tally(&statuses), optimal_interval_minutes })
        .into_response()
}

/// `GET /api/v1/tokens/{tenant_id}`
pub async fn get_token(State(s): State<Arc<AppState>>, Path(tenant_id): Path<String>) -> Response {
    match s.store.find(&tenant_id).await {
        Ok(Some(credential)) => {
            Json(tenant_status(&credential, s.buffer_minutes, epoch_secs())).into_response()
        }
        Ok(None) => ErrorCode::NotFound
            .to_http_response(format!("unknown tenant: {tenant_id}"))
            .into_response(),
        Err(e) => internal(e),
    }
}

/// `POST /api/v1/tokens/{tenant_id}/refresh`
pub async fn refresh_token(
    State(s): State<Arc<AppState>>,
    Path(tenant_id): Path<String>,
) -> Response {
    match s.executor.refresh_tenant(&tenant_id).await {
        Ok(credential) => Json(TenantRefreshResponse {
            tenant_id: credential.tenant_id,
            refreshed: true,
            expires_at: credential.expires_at,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(tenant_id = %tenant_id, err = %e, "manual refresh failed");
            refresh_error_response(&e)
        }
    }
}

fn refresh_error_response(e: &RefreshError) -> Response {
    ErrorCode::from(e).to_http_response(e.to_string()).into_response()
}

/// `POST /api/v1/refresh`
pub async fn run_pass(State(s): State<Arc<AppState>>) -> Response {
    let report = s.scheduler.run_now().await;
    Json(PassResponse { pass_id: report.pass_id, stats: report.stats, error: report.error })
        .into_response()
}

/// `GET /api/v1/scheduler`
pub async fn scheduler_status(State(s): State<Arc<AppState>>) -> Response {
    Json(s.scheduler.status()).into_response()
}

/// `POST /api/v1/scheduler/start`
///
/// Responds once the initial pass has run and the timer is armed.
pub async fn scheduler_start(State(s): State<Arc<AppState>>) -> Response {
    let changed = s.scheduler.start().await;
    Json(SchedulerToggleResponse { changed, status: s.scheduler.status() }).into_response()
}

/// `POST /api/v1/scheduler/stop`
pub async fn scheduler_stop(State(s): State<Arc<AppState>>) -> Response {
    let changed = s.scheduler.stop();
    Json(SchedulerToggleResponse { changed, status: s.scheduler.status() }).into_response()
}

/// `GET /api/v1/oauth/callback?code=...`
///
/// Completes an install: exchanges the authorization code and stores the
/// tenant's first credential.
pub async fn oauth_callback(
    State(s): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return ErrorCode::BadRequest.to_http_response("missing code").into_response();
    };

    let token = match s.provider.exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::warn!(status = ?e.status(), err = %e, "authorization code exchange failed");
            return ErrorCode::UpstreamError.to_http_response(e.to_string()).into_response();
        }
    };
    let Some(tenant_id) = token.tenant_id().map(str::to_owned) else {
        return ErrorCode::BadRequest
            .to_http_response("token response names no location or company")
            .into_response();
    };

    let credential = Credential::from_token(tenant_id.clone(), token, epoch_secs());
    let expires_at = credential.expires_at;
    if let Err(e) = s.store.upsert(credential).await {
        return internal(e);
    }
    tracing::info!(tenant_id = %tenant_id, "tenant installed");
    Json(CallbackResponse { tenant_id, installed: true, expires_at }).into_response()
}

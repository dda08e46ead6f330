// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator HTTP API.

pub mod auth;
pub mod http;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` with all keeper routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/v1/health", get(http::health))
        // Credential status
        .route("/api/v1/tokens", get(http::list_tokens))
        .route("/api/v1/tokens/summary", get(http::tokens_summary))
        .route("/api/v1/tokens/{tenant_id}", get(http::get_token))
        .route("/api/v1/tokens/{tenant_id}/refresh", post(http::refresh_token))
        // Bulk pass and scheduler control
        .route("/api/v1/refresh", post(http::run_pass))
        .route("/api/v1/scheduler", get(http::scheduler_status))
        .route("/api/v1/scheduler/start", post(http::scheduler_start))
        .route("/api/v1/scheduler/stop", post(http::scheduler_stop))
        // Install flow (no auth, browser redirect)
        .route("/api/v1/oauth/callback", get(http::oauth_callback))
        // Middleware
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::provider::TokenExchange;
use crate::refresh::executor::RefreshExecutor;
use crate::refresh::orchestrator::RefreshOrchestrator;
use crate::scheduler::RefreshScheduler;
use crate::store::CredentialStore;

/// Shared keeper state, handed to every HTTP handler.
pub struct AppState {
    pub auth_token: Option<String>,
    pub buffer_minutes: u64,
    pub store: Arc<dyn CredentialStore>,
    pub provider: Arc<dyn TokenExchange>,
    pub executor: Arc<RefreshExecutor>,
    pub scheduler: Arc<RefreshScheduler>,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the refresh components around `store` and `provider`.
    pub fn new(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn TokenExchange>,
    ) -> Arc<Self> {
        let executor = Arc::new(RefreshExecutor::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            config.buffer_minutes,
        ));
        let orchestrator = Arc::new(RefreshOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&executor),
            config.buffer_minutes,
            config.max_concurrent_refreshes,
        ));
        let scheduler =
            RefreshScheduler::new(orchestrator, Arc::clone(&store), config.fallback_retry());

        Arc::new(Self {
            auth_token: config.auth_token.clone(),
            buffer_minutes: config.buffer_minutes,
            store,
            provider,
            executor,
            scheduler,
            shutdown: CancellationToken::new(),
        })
    }
}

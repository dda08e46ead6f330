// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bulk refresh pass over every tenant.
//!
//! Tenants are independent: one tenant's failure is counted and logged, and
//! the pass moves on. Only a failure to enumerate tenants fails the pass.

use std::sync::Arc;

use anyhow::Context;
use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::credential::validate::{self, NO_REFRESH_TOKEN};
use crate::credential::{epoch_secs, Credential};
use crate::refresh::executor::{RefreshAction, RefreshExecutor};
use crate::refresh::{PassReport, RefreshOutcome, RefreshStats};
use crate::store::CredentialStore;

pub struct RefreshOrchestrator {
    store: Arc<dyn CredentialStore>,
    executor: Arc<RefreshExecutor>,
    buffer_minutes: u64,
    max_concurrent: usize,
}

impl RefreshOrchestrator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        executor: Arc<RefreshExecutor>,
        buffer_minutes: u64,
        max_concurrent: usize,
    ) -> Self {
        Self { store, executor, buffer_minutes, max_concurrent: max_concurrent.max(1) }
    }

    /// Run one pass. Errors only when the tenant list cannot be read.
    pub async fn run_pass(&self) -> anyhow::Result<PassReport> {
        let pass_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("refresh_pass", pass_id = %pass_id);
        self.run_pass_inner(pass_id).instrument(span).await
    }

    async fn run_pass_inner(&self, pass_id: String) -> anyhow::Result<PassReport> {
        let started_at = epoch_secs();
        let tenants =
            self.store.list_refreshable().await.context("failed to enumerate tenants")?;
        tracing::debug!(tenants = tenants.len(), "refresh pass started");

        let semaphore = Semaphore::new(self.max_concurrent);
        let outcomes = join_all(tenants.into_iter().map(|credential| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await;
                self.check_tenant(credential).await
            }
        }))
        .await;

        let stats = RefreshStats::from_outcomes(&outcomes);
        tracing::info!(
            checked = stats.checked,
            refreshed = stats.refreshed,
            errors = stats.errors,
            "refresh pass finished"
        );
        Ok(PassReport { pass_id, started_at, finished_at: epoch_secs(), stats, error: None, outcomes })
    }

    async fn check_tenant(&self, credential: Credential) -> RefreshOutcome {
        let tenant_id = credential.tenant_id.clone();
        if !credential.has_refresh_token() {
            tracing::warn!(tenant_id = %tenant_id, "tenant has no refresh token, reinstall required");
            return RefreshOutcome::skipped(tenant_id, NO_REFRESH_TOKEN);
        }

        if credential.expires_at.is_none() {
            tracing::info!(tenant_id = %tenant_id, "legacy record without expiry, renewing");
        } else if !validate::renewal_due(&credential, self.buffer_minutes, epoch_secs()) {
            return RefreshOutcome::unchanged(tenant_id);
        }

        match self.executor.renew(&credential).await {
            Ok(RefreshAction::Refreshed(_)) => RefreshOutcome::refreshed(tenant_id),
            Ok(RefreshAction::AlreadyFresh) => RefreshOutcome::unchanged(tenant_id),
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, err = %e, "credential refresh failed");
                RefreshOutcome::failed(tenant_id, e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

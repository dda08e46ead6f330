// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Refresh executor: renews one tenant's credential and writes it back.
//!
//! Renewals of the same tenant are serialized through a per-tenant lock, so a
//! pass and an operator-triggered refresh cannot both spend the same refresh
//! token or interleave their writes. A tenant's lock lives in the map only
//! while someone holds or waits on it.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::credential::{epoch_secs, validate, Credential};
use crate::provider::{TokenData, TokenExchange};
use crate::refresh::RefreshError;
use crate::store::CredentialStore;

/// Result of a renewal request.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshAction {
    /// New credential issued and stored.
    Refreshed(Credential),
    /// Someone else renewed the tenant while we waited for its lock.
    AlreadyFresh,
}

type LockMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

pub struct RefreshExecutor {
    provider: Arc<dyn TokenExchange>,
    store: Arc<dyn CredentialStore>,
    buffer_minutes: u64,
    locks: LockMap,
}

/// Shared handle on one tenant's lock; drops the map entry with the last handle.
struct TenantLock<'a> {
    locks: &'a LockMap,
    tenant_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for TenantLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // Handles are only cloned under the map lock: two means the map and us.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.tenant_id);
        }
    }
}

impl RefreshExecutor {
    pub fn new(
        provider: Arc<dyn TokenExchange>,
        store: Arc<dyn CredentialStore>,
        buffer_minutes: u64,
    ) -> Self {
        Self { provider, store, buffer_minutes, locks: Mutex::new(HashMap::new()) }
    }

    /// Exchange a refresh token for a new token set. Single attempt, no write.
    pub async fn refresh(
        &self,
        tenant_id: &str,
        refresh_token: &str,
    ) -> Result<TokenData, RefreshError> {
        Ok(self.provider.refresh(tenant_id, refresh_token).await?)
    }

    /// Renew `seen` (a snapshot from a bulk pass) if it is still due.
    pub async fn renew(&self, seen: &Credential) -> Result<RefreshAction, RefreshError> {
        let tenant = self.tenant_lock(&seen.tenant_id);
        let _guard = tenant.lock.lock().await;

        let current = self.load(&seen.tenant_id).await?;
        if current.access_token != seen.access_token
            && current.has_refresh_token()
            && !validate::renewal_due(&current, self.buffer_minutes, epoch_secs())
        {
            tracing::debug!(tenant_id = %seen.tenant_id, "credential renewed concurrently, skipping");
            return Ok(RefreshAction::AlreadyFresh);
        }
        self.renew_locked(current).await.map(RefreshAction::Refreshed)
    }

    /// Renew a tenant now, regardless of its expiry.
    pub async fn refresh_tenant(&self, tenant_id: &str) -> Result<Credential, RefreshError> {
        let tenant = self.tenant_lock(tenant_id);
        let _guard = tenant.lock.lock().await;
        let current = self.load(tenant_id).await?;
        self.renew_locked(current).await
    }

    async fn load(&self, tenant_id: &str) -> Result<Credential, RefreshError> {
        self.store
            .find(tenant_id)
            .await
            .map_err(|e| RefreshError::Store(format!("{e:#}")))?
            .ok_or(RefreshError::TenantNotFound)
    }

    /// Exchange and persist. Caller holds the tenant lock.
    async fn renew_locked(&self, current: Credential) -> Result<Credential, RefreshError> {
        let refresh_token = match current.refresh_token.as_deref() {
            Some(rt) if !rt.is_empty() => rt.to_owned(),
            _ => return Err(RefreshError::NoRefreshToken),
        };

        let token = self.refresh(&current.tenant_id, &refresh_token).await?;
        let renewed = current.renewed(token, epoch_secs());
        self.store
            .replace_credential(renewed.clone())
            .await
            .map_err(|e| RefreshError::Store(format!("{e:#}")))?;

        tracing::info!(
            tenant_id = %renewed.tenant_id,
            expires_at = renewed.expires_at,
            "credential refreshed"
        );
        Ok(renewed)
    }

    fn tenant_lock(&self, tenant_id: &str) -> TenantLock<'_> {
        let lock = Arc::clone(self.locks.lock().entry(tenant_id.to_owned()).or_default());
        TenantLock { locks: &self.locks, tenant_id: tenant_id.to_owned(), lock }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: the only shared mutable resource.
//!
//! Access follows read-all-then-write-one. No operation spans more than one
//! tenant, and a credential is always replaced as a whole record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::credential::Credential;

/// Persistence boundary for tenant credentials.
///
/// Object-safe for use as `Arc<dyn CredentialStore>`.
pub trait CredentialStore: Send + Sync {
    /// Tenants with a non-empty access token and an expiration signal.
    fn list_refreshable(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>>;

    /// Every stored credential.
    fn list_all(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>>;

    fn find<'a>(&'a self, tenant_id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<Credential>>>;

    /// Replace an existing tenant's credential in one write. Fails for unknown tenants.
    fn replace_credential(&self, credential: Credential) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Insert or overwrite a credential (authorization-code install).
    fn upsert(&self, credential: Credential) -> BoxFuture<'_, anyhow::Result<()>>;
}

/// On-disk layout of the JSON store.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PersistedTenants {
    pub tenants: BTreeMap<String, Credential>,
}

/// Load persisted tenants from a JSON file.
pub fn load(path: &Path) -> anyhow::Result<PersistedTenants> {
    let contents = std::fs::read_to_string(path)?;
    let tenants: PersistedTenants = serde_json::from_str(&contents)?;
    Ok(tenants)
}

/// Save persisted tenants to a JSON file atomically (write tmp + rename).
///
/// Uses a unique temp filename (PID + counter) so concurrent saves never
/// share a `.tmp` file.
pub fn save(path: &Path, tenants: &PersistedTenants) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string_pretty(tenants)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// In-memory credential store, optionally mirrored to a JSON file.
#[derive(Debug)]
pub struct JsonStore {
    tenants: RwLock<BTreeMap<String, Credential>>,
    path: Option<PathBuf>,
}

impl JsonStore {
    /// Store without persistence.
    pub fn in_memory() -> Self {
        Self { tenants: RwLock::new(BTreeMap::new()), path: None }
    }

    /// In-memory store pre-populated with `credentials`.
    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let tenants = credentials.into_iter().map(|c| (c.tenant_id.clone(), c)).collect();
        Self { tenants: RwLock::new(tenants), path: None }
    }

    /// Open a file-backed store. A missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let tenants = if path.exists() {
            load(&path)
                .with_context(|| format!("failed to load credential store {}", path.display()))?
                .tenants
        } else {
            tracing::info!(path = %path.display(), "no credential store yet, starting empty");
            BTreeMap::new()
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tracing::info!(path = %path.display(), tenants = tenants.len(), "credential store loaded");
        Ok(Self { tenants: RwLock::new(tenants), path: Some(path) })
    }

    /// Write `tenants` to disk if this store is file-backed.
    fn persist(&self, tenants: &BTreeMap<String, Credential>) -> anyhow::Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let snapshot = PersistedTenants { tenants: tenants.clone() };
        save(path, &snapshot)
            .with_context(|| format!("failed to persist credential store {}", path.display()))?;
        tracing::debug!(path = %path.display(), tenants = tenants.len(), "persisted credentials");
        Ok(())
    }

    /// Insert `credential`, rolling the map back if the disk write fails.
    async fn write(&self, credential: Credential, must_exist: bool) -> anyhow::Result<()> {
        let mut tenants = self.tenants.write().await;
        if must_exist && !tenants.contains_key(&credential.tenant_id) {
            anyhow::bail!("unknown tenant: {}", credential.tenant_id);
        }
        let tenant_id = credential.tenant_id.clone();
        let previous = tenants.insert(tenant_id.clone(), credential);
        if let Err(e) = self.persist(&tenants) {
            match previous {
                Some(prev) => tenants.insert(tenant_id, prev),
                None => tenants.remove(&tenant_id),
            };
            return Err(e);
        }
        Ok(())
    }
}

impl CredentialStore for JsonStore {
    fn list_refreshable(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>> {
        Box::pin(async move {
            let tenants = self.tenants.read().await;
            Ok(tenants
                .values()
                .filter(|c| !c.access_token.is_empty() && c.has_expiration_signal())
                .cloned()
                .collect())
        })
    }

    fn list_all(&self) -> BoxFuture<'_, anyhow::Result<Vec<Credential>>> {
        Box::pin(async move { Ok(self.tenants.read().await.values().cloned().collect()) })
    }

    fn find<'a>(&'a self, tenant_id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<Credential>>> {
        Box::pin(async move { Ok(self.tenants.read().await.get(tenant_id).cloned()) })
    }

    fn replace_credential(&self, credential: Credential) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.write(credential, true))
    }

    fn upsert(&self, credential: Credential) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(self.write(credential, false))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential renewal: the per-tenant executor and the bulk pass over all tenants.

pub mod executor;
pub mod orchestrator;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderError;

/// Aggregate counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStats {
    /// Tenants examined, whatever the outcome.
    pub checked: u32,
    pub refreshed: u32,
    /// Renewal attempts that failed.
    pub errors: u32,
}

impl RefreshStats {
    pub fn from_outcomes(outcomes: &[RefreshOutcome]) -> Self {
        let mut stats = Self::default();
        for outcome in outcomes {
            stats.checked += 1;
            if outcome.succeeded {
                stats.refreshed += 1;
            } else if outcome.attempted {
                stats.errors += 1;
            }
        }
        stats
    }
}

/// What happened to one tenant during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub tenant_id: String,
    pub attempted: bool,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefreshOutcome {
    /// Checked, nothing to do.
    pub fn unchanged(tenant_id: impl Into<String>) -> Self {
        Self { tenant_id: tenant_id.into(), attempted: false, succeeded: false, error: None }
    }

    /// Checked, renewal impossible (never retried).
    pub fn skipped(tenant_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            attempted: false,
            succeeded: false,
            error: Some(reason.into()),
        }
    }

    pub fn refreshed(tenant_id: impl Into<String>) -> Self {
        Self { tenant_id: tenant_id.into(), attempted: true, succeeded: true, error: None }
    }

    pub fn failed(tenant_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            attempted: true,
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Result of one bulk pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: String,
    pub started_at: u64,
    pub finished_at: u64,
    pub stats: RefreshStats,
    /// Set when the tenants could not be enumerated at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<RefreshOutcome>,
}

impl PassReport {
    /// Zero-progress report for a pass that could not list tenants.
    pub fn enumeration_failed(
        pass_id: impl Into<String>,
        started_at: u64,
        finished_at: u64,
        error: &anyhow::Error,
    ) -> Self {
        Self {
            pass_id: pass_id.into(),
            started_at,
            finished_at,
            stats: RefreshStats::default(),
            error: Some(format!("{error:#}")),
            outcomes: Vec::new(),
        }
    }
}

/// Failure renewing a single tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// Permanent: the tenant has no refresh token.
    NoRefreshToken,
    TenantNotFound,
    Provider(ProviderError),
    /// The new credential could not be written back.
    Store(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRefreshToken => f.write_str(crate::credential::validate::NO_REFRESH_TOKEN),
            Self::TenantNotFound => f.write_str("tenant not found"),
            Self::Provider(e) => write!(f, "{e}"),
            Self::Store(msg) => write!(f, "credential store error: {msg}"),
        }
    }
}

impl std::error::Error for RefreshError {}

impl From<ProviderError> for RefreshError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

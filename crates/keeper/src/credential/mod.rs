// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-tenant OAuth credentials and the pure rules that classify them.
//!
//! A tenant owns exactly one [`Credential`]. It is created by the
//! authorization-code install and afterwards only ever replaced as a whole by
//! the refresh executor, so the token fields and the expiry metadata never
//! drift apart.

pub mod expiry;
pub mod status;
pub mod validate;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::provider::TokenData;

/// OAuth credential held for a single tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Stable identifier of the owning tenant (location).
    pub tenant_id: String,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// When the current access token was minted, as epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<u64>,
    /// Validity announced by the provider at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_secs: Option<u64>,
    /// Expiry as epoch seconds. Absent on records written before the field existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Provider-specific fields from the last token response.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Credential {
    /// Build a credential from a token response minted at `now`.
    pub fn from_token(tenant_id: impl Into<String>, token: TokenData, now: u64) -> Self {
        let mut metadata = token.extra;
        for (key, value) in [
            ("locationId", token.location_id),
            ("companyId", token.company_id),
            ("userType", token.user_type),
        ] {
            if let Some(v) = value {
                metadata.insert(key.to_owned(), serde_json::Value::String(v));
            }
        }
        Self {
            tenant_id: tenant_id.into(),
            access_token: token.access_token,
            refresh_token: token.refresh_token.filter(|t| !t.is_empty()),
            issued_at: Some(now),
            lifetime_secs: Some(token.expires_in),
            expires_at: Some(expiry::expires_at(now, token.expires_in)),
            token_type: token.token_type,
            scope: token.scope,
            metadata,
        }
    }

    /// Successor of `self` after a successful refresh.
    ///
    /// Every token and expiry field is replaced together. A provider that does
    /// not rotate the refresh token keeps the previous one in place.
    pub fn renewed(&self, token: TokenData, now: u64) -> Self {
        let mut next = Self::from_token(self.tenant_id.clone(), token, now);
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        next
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the record carries anything to derive an expiry from.
    pub fn has_expiration_signal(&self) -> bool {
        self.expires_at.is_some() || self.lifetime_secs.is_some()
    }
}

/// Current wall-clock time as epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

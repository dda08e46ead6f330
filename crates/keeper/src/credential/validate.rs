// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential validity classification.

use serde::Serialize;

use crate::credential::expiry::{self, Expiry};
use crate::credential::Credential;

/// Reason reported for credentials that can never be refreshed.
pub const NO_REFRESH_TOKEN: &str = "no refresh token";

/// Reason reported for credentials without a usable expiry.
pub const CANNOT_DETERMINE_EXPIRATION: &str = "cannot determine expiration";

/// Outcome of validating one credential at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub is_valid: bool,
    pub is_expired: bool,
    pub is_expiring_soon: bool,
    pub seconds_until_expiry: u64,
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

impl Validation {
    fn invalid(reason: &'static str, is_expiring_soon: bool) -> Self {
        Self {
            is_valid: false,
            is_expired: true,
            is_expiring_soon,
            seconds_until_expiry: 0,
            expires_at: None,
            reason: Some(reason),
        }
    }

    pub fn should_refresh(&self) -> bool {
        self.is_expired || self.is_expiring_soon || !self.is_valid
    }
}

/// Resolve the expiry of a credential.
///
/// A stored `expires_at` wins when it holds a real timestamp; otherwise the
/// expiry is derived from issuance time and lifetime.
pub fn resolve_expiry(credential: &Credential) -> Expiry {
    if let Some(Expiry::At(ts)) = credential.expires_at.map(Expiry::from_timestamp) {
        return Expiry::At(ts);
    }
    match credential.lifetime_secs {
        Some(lifetime) => expiry::legacy_expires_at(credential.issued_at, lifetime),
        None => Expiry::Indeterminate,
    }
}

pub fn validate(credential: &Credential, buffer_minutes: u64, now: u64) -> Validation {
    if !credential.has_refresh_token() {
        return Validation::invalid(NO_REFRESH_TOKEN, false);
    }

    let expires_at = match resolve_expiry(credential) {
        Expiry::At(ts) => ts,
        Expiry::Indeterminate => return Validation::invalid(CANNOT_DETERMINE_EXPIRATION, true),
    };

    let is_expired = expires_at < now;
    let is_expiring_soon = expiry::is_expiring_soon(expires_at, buffer_minutes, now);
    Validation {
        is_valid: !is_expired && !is_expiring_soon,
        is_expired,
        is_expiring_soon,
        seconds_until_expiry: expiry::seconds_until_expiry(expires_at, now),
        expires_at: Some(expires_at),
        reason: None,
    }
}

pub fn should_refresh(credential: &Credential, buffer_minutes: u64, now: u64) -> bool {
    validate(credential, buffer_minutes, now).should_refresh()
}

/// Whether a bulk pass should renew this credential.
///
/// Records without a stored `expires_at` are renewed unconditionally so that
/// legacy data heals itself; everything else goes through [`should_refresh`].
/// Callers must check [`Credential::has_refresh_token`] first.
pub fn renewal_due(credential: &Credential, buffer_minutes: u64, now: u64) -> bool {
    credential.expires_at.is_none() || should_refresh(credential, buffer_minutes, now)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;

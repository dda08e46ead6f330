// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-facing status derived from validation results.

use serde::{Deserialize, Serialize};

use crate::credential::expiry::{self, Expiry};
use crate::credential::validate::{self, CANNOT_DETERMINE_EXPIRATION};
use crate::credential::Credential;

/// Validity class of a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityClass {
    Valid,
    ExpiringSoon,
    Expired,
    /// Not enough data to compute an expiry; renewed on the next pass.
    Indeterminate,
    /// Permanent error: the tenant has to reinstall.
    NoRefreshToken,
}

/// Status snapshot for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantStatus {
    pub tenant_id: String,
    pub class: ValidityClass,
    pub seconds_until_expiry: u64,
    /// Human-readable remaining time, e.g. `3h 12m`.
    pub remaining: String,
    pub next_check_minutes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub fn tenant_status(credential: &Credential, buffer_minutes: u64, now: u64) -> TenantStatus {
    let v = validate::validate(credential, buffer_minutes, now);
    let class = if !credential.has_refresh_token() {
        ValidityClass::NoRefreshToken
    } else if v.reason == Some(CANNOT_DETERMINE_EXPIRATION) {
        ValidityClass::Indeterminate
    } else if v.is_expired {
        ValidityClass::Expired
    } else if v.is_expiring_soon {
        ValidityClass::ExpiringSoon
    } else {
        ValidityClass::Valid
    };
    // Remaining time of the current access token, also for orphaned tenants.
    let expiry = validate::resolve_expiry(credential);
    let (expires_at, seconds_until_expiry) = match expiry {
        Expiry::At(ts) => (Some(ts), expiry::seconds_until_expiry(ts, now)),
        Expiry::Indeterminate => (None, 0),
    };

    TenantStatus {
        tenant_id: credential.tenant_id.clone(),
        class,
        seconds_until_expiry,
        remaining: format_remaining(seconds_until_expiry),
        next_check_minutes: expiry::next_check_interval_minutes(expiry.timestamp(), now),
        expires_at,
        reason: v.reason.map(str::to_owned),
    }
}

/// Format a remaining lifetime with its two most significant units.
pub fn format_remaining(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;
    match secs {
        0 => "expired".to_owned(),
        1..=59 => format!("{secs}s"),
        60..=3599 => format!("{minutes}m"),
        3600..=86399 => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h"),
    }
}

/// Global counts by validity class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub valid: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    pub indeterminate: usize,
    pub no_refresh_token: usize,
}

impl StatusCounts {
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a TenantStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.total += 1;
            match status.class {
                ValidityClass::Valid => counts.valid += 1,
                ValidityClass::ExpiringSoon => counts.expiring_soon += 1,
                ValidityClass::Expired => counts.expired += 1,
                ValidityClass::Indeterminate => counts.indeterminate += 1,
                ValidityClass::NoRefreshToken => counts.no_refresh_token += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;

    fn credential(id: &str, refresh: Option<&str>, expires_at: Option<u64>) -> Credential {
        Credential {
            tenant_id: id.to_owned(),
            access_token: "access".to_owned(),
            refresh_token: refresh.map(str::to_owned),
            issued_at: None,
            lifetime_secs: None,
            expires_at,
            token_type: None,
            scope: None,
            metadata: Default::default(),
        }
    }

    #[yare::parameterized(
        expired      = { 0, "expired" },
        seconds      = { 42, "42s" },
        minutes      = { 12 * 60 + 5, "12m" },
        hours        = { 3 * 3600 + 12 * 60, "3h 12m" },
        days         = { 2 * 86400 + 5 * 3600 + 59, "2d 5h" },
    )]
    fn formats_remaining(secs: u64, expected: &str) {
        assert_eq!(format_remaining(secs), expected);
    }

    #[test]
    fn classifies_each_state() {
        let cases = [
            (credential("a", Some("r"), Some(NOW + 3 * 86400)), ValidityClass::Valid),
            (credential("b", Some("r"), Some(NOW + 120)), ValidityClass::ExpiringSoon),
            (credential("c", Some("r"), Some(NOW - 120)), ValidityClass::Expired),
            (credential("d", Some("r"), None), ValidityClass::Indeterminate),
            (credential("e", None, Some(NOW + 86400)), ValidityClass::NoRefreshToken),
        ];
        for (cred, expected) in &cases {
            assert_eq!(tenant_status(cred, 10, NOW).class, *expected, "tenant {}", cred.tenant_id);
        }

        let statuses: Vec<_> = cases.iter().map(|(c, _)| tenant_status(c, 10, NOW)).collect();
        let counts = StatusCounts::tally(&statuses);
        assert_eq!(
            counts,
            StatusCounts {
                total: 5,
                valid: 1,
                expiring_soon: 1,
                expired: 1,
                indeterminate: 1,
                no_refresh_token: 1,
            }
        );
    }

    #[test]
    fn status_reports_recommended_interval() {
        let near = tenant_status(&credential("a", Some("r"), Some(NOW + 3600)), 10, NOW);
        assert_eq!(near.next_check_minutes, 240);
        assert_eq!(near.remaining, "1h 0m");
        assert_eq!(near.expires_at, Some(NOW + 3600));

        let far = tenant_status(&credential("b", Some("r"), Some(NOW + 5 * 86400)), 10, NOW);
        assert_eq!(far.next_check_minutes, 720);

        let unknown = tenant_status(&credential("c", Some("r"), None), 10, NOW);
        assert_eq!(unknown.expires_at, None);
        assert_eq!(unknown.reason.as_deref(), Some(CANNOT_DETERMINE_EXPIRATION));
    }

    #[test]
    fn orphaned_tenant_reports_real_remaining_time() {
        let orphan = tenant_status(&credential("e", None, Some(NOW + 86_400 + 3600)), 10, NOW);
        assert_eq!(orphan.class, ValidityClass::NoRefreshToken);
        assert_eq!(orphan.seconds_until_expiry, 86_400 + 3600);
        assert_eq!(orphan.remaining, "1d 1h");
        assert_eq!(orphan.expires_at, Some(NOW + 86_400 + 3600));
        assert_eq!(orphan.reason.as_deref(), Some(validate::NO_REFRESH_TOKEN));

        let lapsed = tenant_status(&credential("f", None, Some(NOW - 60)), 10, NOW);
        assert_eq!(lapsed.class, ValidityClass::NoRefreshToken);
        assert_eq!(lapsed.remaining, "expired");
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use proptest::prelude::*;

use super::*;

const NOW: u64 = 1_700_000_000;

fn credential(expires_at: Option<u64>) -> Credential {
    Credential {
        tenant_id: "loc-1".to_owned(),
        access_token: "access".to_owned(),
        refresh_token: Some("refresh".to_owned()),
        issued_at: None,
        lifetime_secs: None,
        expires_at,
        token_type: Some("Bearer".to_owned()),
        scope: None,
        metadata: Default::default(),
    }
}

#[test]
fn far_expiry_is_valid() {
    let v = validate(&credential(Some(NOW + 86400)), 10, NOW);
    assert!(v.is_valid);
    assert!(!v.is_expired);
    assert!(!v.is_expiring_soon);
    assert_eq!(v.seconds_until_expiry, 86400);
    assert_eq!(v.expires_at, Some(NOW + 86400));
    assert_eq!(v.reason, None);
    assert!(!v.should_refresh());
}

#[test]
fn within_buffer_is_expiring_soon() {
    let v = validate(&credential(Some(NOW + 300)), 10, NOW);
    assert!(!v.is_valid);
    assert!(!v.is_expired);
    assert!(v.is_expiring_soon);
    assert_eq!(v.seconds_until_expiry, 300);
    assert!(v.should_refresh());
}

#[test]
fn past_expiry_is_expired() {
    let v = validate(&credential(Some(NOW - 1)), 10, NOW);
    assert!(v.is_expired);
    assert!(v.is_expiring_soon);
    assert_eq!(v.seconds_until_expiry, 0);
}

#[test]
fn missing_refresh_token_is_terminal() {
    let mut cred = credential(Some(NOW + 86400));
    cred.refresh_token = None;
    let v = validate(&cred, 10, NOW);
    assert!(!v.is_valid);
    assert!(v.is_expired);
    assert_eq!(v.reason, Some(NO_REFRESH_TOKEN));

    cred.refresh_token = Some(String::new());
    assert_eq!(validate(&cred, 10, NOW).reason, Some(NO_REFRESH_TOKEN));
}

#[test]
fn no_expiry_data_is_indeterminate() {
    let v = validate(&credential(None), 10, NOW);
    assert!(v.is_expired);
    assert!(v.is_expiring_soon);
    assert_eq!(v.expires_at, None);
    assert_eq!(v.reason, Some(CANNOT_DETERMINE_EXPIRATION));
    assert!(v.should_refresh());
}

#[test]
fn lifetime_without_issue_time_is_indeterminate() {
    let mut cred = credential(None);
    cred.lifetime_secs = Some(86399);
    assert_eq!(resolve_expiry(&cred), Expiry::Indeterminate);
    assert_eq!(validate(&cred, 10, NOW).reason, Some(CANNOT_DETERMINE_EXPIRATION));
}

#[test]
fn stored_expiry_wins_over_derived() {
    let mut cred = credential(Some(NOW + 7200));
    cred.issued_at = Some(NOW - 86400);
    cred.lifetime_secs = Some(3600);
    assert_eq!(resolve_expiry(&cred), Expiry::At(NOW + 7200));
}

#[test]
fn zero_stored_expiry_falls_back_to_legacy() {
    let mut cred = credential(Some(0));
    cred.issued_at = Some(NOW);
    cred.lifetime_secs = Some(3600);
    assert_eq!(resolve_expiry(&cred), Expiry::At(NOW + 3600));

    cred.issued_at = None;
    assert_eq!(resolve_expiry(&cred), Expiry::Indeterminate);
}

#[test]
fn daily_token_five_minutes_before_expiry() {
    let issued = NOW;
    let mut cred = credential(None);
    cred.issued_at = Some(issued);
    cred.lifetime_secs = Some(86399);
    cred.expires_at = Some(expiry::expires_at(issued, 86399));

    let v = validate(&cred, 10, issued + 86399 - 300);
    assert!(v.is_expiring_soon);
    assert_eq!(v.seconds_until_expiry, 300);
}

#[test]
fn renewal_due_for_legacy_record_even_when_derivable() {
    let mut cred = credential(None);
    cred.issued_at = Some(NOW);
    cred.lifetime_secs = Some(86400);
    // Derived expiry is a day out, but the stored field is missing.
    assert!(!should_refresh(&cred, 10, NOW));
    assert!(renewal_due(&cred, 10, NOW));
}

#[test]
fn renewal_not_due_for_fresh_credential() {
    assert!(!renewal_due(&credential(Some(NOW + 86400)), 10, NOW));
    assert!(renewal_due(&credential(Some(NOW + 60)), 10, NOW));
}

proptest! {
    #[test]
    fn outside_buffer_never_refreshes(buffer in 0u64..1440, extra in 1u64..10_000_000) {
        let cred = credential(Some(NOW + buffer * 60 + extra));
        let v = validate(&cred, buffer, NOW);
        prop_assert!(v.is_valid);
        prop_assert!(!should_refresh(&cred, buffer, NOW));
    }

    #[test]
    fn inside_buffer_always_refreshes(buffer in 0u64..1440, back in 0u64..10_000_000) {
        // Anywhere from the buffer edge back into the past.
        let cred = credential(Some((NOW + buffer * 60).saturating_sub(back).max(1)));
        let v = validate(&cred, buffer, NOW);
        prop_assert!(v.is_expiring_soon);
        prop_assert!(should_refresh(&cred, buffer, NOW));
    }
}

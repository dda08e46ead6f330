// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::{HeaderMap, HeaderValue};

use super::*;

fn headers(auth: Option<&'static str>) -> HeaderMap {
    let mut map = HeaderMap::new();
    if let Some(value) = auth {
        map.insert("authorization", HeaderValue::from_static(value));
    }
    map
}

#[yare::parameterized(
    auth_disabled   = { None, None, true },
    disabled_ignores_header = { Some("Bearer whatever"), None, true },
    correct_token   = { Some("Bearer s3cret"), Some("s3cret"), true },
    wrong_token     = { Some("Bearer nope"), Some("s3cret"), false },
    prefix_only     = { Some("Bearer s3c"), Some("s3cret"), false },
    missing_header  = { None, Some("s3cret"), false },
    wrong_scheme    = { Some("Basic s3cret"), Some("s3cret"), false },
)]
fn bearer_validation(header: Option<&'static str>, expected: Option<&str>, ok: bool) {
    let result = validate_bearer(&headers(header), expected);
    assert_eq!(result.is_ok(), ok, "{result:?}");
    if !ok {
        assert_eq!(result, Err(ErrorCode::Unauthorized));
    }
}

#[test]
fn constant_time_eq_compares_whole_string() {
    assert!(constant_time_eq("abc", "abc"));
    assert!(!constant_time_eq("abc", "abd"));
    assert!(!constant_time_eq("abc", "abcd"));
    assert!(constant_time_eq("", ""));
}

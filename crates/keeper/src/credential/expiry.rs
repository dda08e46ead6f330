// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expiration arithmetic. Pure functions over epoch seconds; `now` is always
//! passed in by the caller.

/// Lead time before expiry at which a credential is due for renewal.
pub const DEFAULT_BUFFER_MINUTES: u64 = 10;

/// Check interval used when a credential is within [`NEAR_EXPIRY_MINUTES`],
/// and when there is nothing to schedule against.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 240;

/// Check interval used while every credential is comfortably far from expiry.
pub const RELAXED_INTERVAL_MINUTES: u64 = 720;

/// Remaining lifetime at or below which the tighter interval applies (48h).
pub const NEAR_EXPIRY_MINUTES: u64 = 2880;

/// Hard floor for the scheduler interval.
pub const MIN_INTERVAL_MINUTES: u64 = 5;

const EPOCH_ORIGIN: u64 = 0;

/// A resolved expiry.
///
/// `Indeterminate` stands for records without enough data to compute a real
/// expiry. It compares as the epoch origin, so it is expired relative to any
/// later `now` and always triggers a renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    At(u64),
    Indeterminate,
}

impl Expiry {
    /// Interpret a stored timestamp; the epoch origin is not a real expiry.
    pub fn from_timestamp(ts: u64) -> Self {
        if ts == EPOCH_ORIGIN {
            Self::Indeterminate
        } else {
            Self::At(ts)
        }
    }

    pub fn timestamp(self) -> u64 {
        match self {
            Self::At(ts) => ts,
            Self::Indeterminate => EPOCH_ORIGIN,
        }
    }

    pub fn is_indeterminate(self) -> bool {
        matches!(self, Self::Indeterminate)
    }
}

/// `issued_at + lifetime_secs`.
pub fn expires_at(issued_at: u64, lifetime_secs: u64) -> u64 {
    issued_at.saturating_add(lifetime_secs)
}

/// True when `expires_at` falls within `buffer_minutes` of `now`, including
/// when it is already in the past.
pub fn is_expiring_soon(expires_at: u64, buffer_minutes: u64, now: u64) -> bool {
    expires_at <= now.saturating_add(buffer_minutes.saturating_mul(60))
}

/// Whole seconds left until `expires_at`, never negative.
pub fn seconds_until_expiry(expires_at: u64, now: u64) -> u64 {
    expires_at.saturating_sub(now)
}

/// Expiry for records that predate the stored `expires_at` field.
///
/// Without an issuance time there is nothing to anchor the lifetime to, so the
/// result is [`Expiry::Indeterminate`].
pub fn legacy_expires_at(issued_at: Option<u64>, lifetime_secs: u64) -> Expiry {
    match issued_at {
        Some(issued) => Expiry::from_timestamp(expires_at(issued, lifetime_secs)),
        None => Expiry::Indeterminate,
    }
}

/// How often a single credential should be re-checked as it nears expiry.
pub fn next_check_interval_minutes(expires_at: u64, now: u64) -> u64 {
    if seconds_until_expiry(expires_at, now) <= NEAR_EXPIRY_MINUTES * 60 {
        DEFAULT_INTERVAL_MINUTES
    } else {
        RELAXED_INTERVAL_MINUTES
    }
}

/// Delay until the next bulk pass, driven by the earliest expiry in the set.
pub fn optimal_interval_minutes(expirations: &[u64], now: u64) -> u64 {
    let Some(earliest) = expirations.iter().copied().min() else {
        return DEFAULT_INTERVAL_MINUTES;
    };
    next_check_interval_minutes(earliest, now).max(MIN_INTERVAL_MINUTES)
}

#[cfg(test)]
#[path = "expiry_tests.rs"]
mod tests;

// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! All persisted timestamps use `%Y-%m-%dT%H:%M:%S%.3fZ` (millisecond UTC),
//! the same shape SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ','now')` produces,
//! so string comparison and SQL comparison agree.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Milliseconds in one day, used by [`days_until_expiry`].
const DAY_MS: i64 = 86_400_000;

/// Current UTC time in the canonical millisecond format.
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Formats a timestamp in the canonical millisecond format.
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Canonical timestamp `duration` from now. Negative durations yield a
/// timestamp in the past.
pub fn iso_after(duration: Duration) -> String {
    to_iso(Utc::now() + duration)
}

/// Canonical timestamp for a provider epoch value in milliseconds.
/// Out-of-range values clamp to the epoch.
pub fn millis_to_iso(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(to_iso)
        .unwrap_or_else(|| to_iso(DateTime::<Utc>::UNIX_EPOCH))
}

/// Parses a canonical (or any RFC 3339) timestamp.
pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Whole days until `expiry`, floored. Already-expired timestamps
/// produce negative values.
pub fn days_until_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = expiry.signed_duration_since(now).num_milliseconds();
    ms.div_euclid(DAY_MS)
}

/// Informational display band for a credential's remaining lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryBand {
    Expired,
    Red,
    Yellow,
    Green,
}

impl ExpiryBand {
    /// Band for a remaining lifetime in whole days.
    pub fn for_days(days: i64) -> Self {
        match days {
            d if d <= 0 => ExpiryBand::Expired,
            d if d <= 5 => ExpiryBand::Red,
            d if d <= 14 => ExpiryBand::Yellow,
            _ => ExpiryBand::Green,
        }
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.
//!
//! All document timestamps are RFC3339 strings in UTC so that Firestore's
//! lexicographic ordering matches chronological ordering.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current server time as an RFC3339 string.
///
/// Microsecond precision keeps distinct writes distinct for the audit-log
/// ordering, which sorts on this string.
pub fn now_rfc3339() -> String {
    format_utc_rfc3339(Utc::now())
}

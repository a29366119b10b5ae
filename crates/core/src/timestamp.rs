//! UTC timestamps at store precision.
//!
//! Postgres `TIMESTAMPTZ` keeps microseconds, so every timestamp produced by
//! the domain is truncated to microseconds up front. That keeps in-memory and
//! Postgres stores byte-for-byte identical when serialized.

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

/// Current UTC time, truncated to microseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Returns a timestamp strictly after `previous`: `candidate` when it already
/// is, otherwise `previous + 1µs`.
///
/// Used for `updated_at` refreshes so two updates within one clock tick still
/// produce increasing values.
pub fn after(previous: DateTime<Utc>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    let candidate = candidate.trunc_subsecs(6);
    if candidate > previous {
        candidate
    } else {
        previous + Duration::microseconds(1)
    }
}

/// ISO-8601 / RFC 3339 rendering used in API responses,
/// e.g. `2026-10-18T09:15:02.123456Z`.
pub fn to_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

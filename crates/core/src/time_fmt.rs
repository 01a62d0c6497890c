// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timestamp rendering for the workspace document.

use chrono::{DateTime, SecondsFormat, Utc};

/// Render epoch milliseconds as an RFC 3339 / ISO-8601 UTC timestamp.
///
/// Out-of-range values clamp to the epoch rather than failing — a bad
/// timestamp in a progress event must never abort a workspace write.
pub fn iso_ms(epoch_ms: u64) -> String {
    let ts = DateTime::<Utc>::from_timestamp_millis(epoch_ms as i64)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;

// 💲 Fee Calculator - elapsed time → charge
//
// Pure functions: no storage, no clock. Callers pass both timestamps.
//
// Billing unit is the whole minute with a 1-minute minimum, so a stay can
// never be free. An exit stamped before its entry (clock skew) also bills
// the minimum.

use chrono::{DateTime, Utc};

use crate::rates::{RateKind, RatePolicy};

pub const MINUTES_PER_DAY: i64 = 24 * 60;

/// Whole minutes between two instants, floored (may be negative on skew)
pub fn elapsed_minutes(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> i64 {
    (exit_time - entry_time).num_milliseconds().div_euclid(60_000)
}

/// Minutes actually billed: elapsed minutes, never less than one
pub fn billable_minutes(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> i64 {
    elapsed_minutes(entry_time, exit_time).max(1)
}

/// Started days covered by a stay; a partial day counts in full
pub fn billable_days(minutes: i64) -> i64 {
    (minutes + MINUTES_PER_DAY - 1).div_euclid(MINUTES_PER_DAY)
}

/// Charge for a stay under `policy`, unrounded
///
/// The product is stored as-is when the exit is confirmed; cents only appear
/// when an amount is displayed, exported, or summed into a report.
pub fn compute_charge(
    entry_time: DateTime<Utc>,
    exit_time: DateTime<Utc>,
    policy: &RatePolicy,
) -> f64 {
    let minutes = billable_minutes(entry_time, exit_time);

    match policy.kind {
        RateKind::PerMinute => minutes as f64 * policy.cost_per_minute,
        RateKind::PerDay => billable_days(minutes) as f64 * policy.daily_rate,
    }
}

/// Two-decimal rounding for totals shown to the operator
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// "45 min" under an hour, "2h 5min" from there on
pub fn format_parking_time(minutes: i64) -> String {
    if minutes < 60 {
        format!("{} min", minutes)
    } else {
        format!("{}h {}min", minutes / 60, minutes % 60)
    }
}

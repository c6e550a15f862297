//! Keeps the local `subscriptions` and `usage` tables in step with the payment processor.

mod reconcile;
mod store;

pub use reconcile::*;
pub use store::*;

use chrono::{DateTime, Duration, Months, TimeZone, Utc};

/// Billing periods are calendar months.
pub fn one_month_after(start: DateTime<Utc>) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(1))
        .unwrap_or_else(|| start + Duration::days(30))
}

pub fn from_unix_timestamp(seconds: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(seconds, 0).single()
}

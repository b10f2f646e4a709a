//! Daily → weekly → monthly exercise rollups.
//!
//! Each level reads the level below and overwrites its own row by natural key,
//! so any level can be recomputed at any time without drift:
//! - daily: raw sets for one (user, exercise, date)
//! - weekly: daily rows inside one week, plus an OLS volume trend
//! - monthly: weekly rows starting inside one month, plus a consistency score
//!
//! Zero input rows is not an error. The aggregator logs it and leaves any
//! existing row for that key untouched.

pub mod calendar;
pub mod coordinator;
pub mod daily;
pub mod monthly;
pub mod weekly;

use crate::error::RollupError;

pub use coordinator::{AggregationCoordinator, CascadeOutcome, ProcessingKey, TriggerReport};
pub use daily::aggregate_daily;
pub use monthly::aggregate_monthly;
pub use weekly::aggregate_weekly;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollupLevel {
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for RollupLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn log_storage_failure(level: RollupLevel, user_id: i64, exercise_name: &str, err: &RollupError) {
    tracing::error!(
        user_id,
        exercise_name,
        level = %level,
        error = %err,
        "Rollup storage operation failed"
    );
}

/// Sum of the present values; `None` when every value is absent
pub(crate) fn sum_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values
        .into_iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Max of the present values; `None` when every value is absent
pub(crate) fn max_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    values.into_iter().flatten().fold(None, |acc, v| match acc {
        Some(m) if m >= v => Some(m),
        _ => Some(v),
    })
}

/// Least-squares slope of `values` against their 1-based position.
///
/// Positions are sequence indices, not calendar days, so gaps between
/// samples are ignored. Needs at least two samples.
pub fn trend_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (i, y) in values.iter().enumerate() {
        let x = (i + 1) as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }

    Some((n * sum_xy - sum_x * sum_y) / denominator)
}

use chrono::{DateTime, NaiveDate, Utc};

use super::calendar::month_end;
use super::{log_storage_failure, max_present, sum_present, RollupLevel};
use crate::error::RollupResult;
use crate::models::{MonthlySummary, WeeklySummary};
use crate::store::RollupStore;

/// Recompute the monthly rollup from the weekly rows whose `week_start` falls
/// between `month_start` and the end of that calendar month.
pub async fn aggregate_monthly(
    store: &dyn RollupStore,
    user_id: i64,
    exercise_name: &str,
    month_start: NaiveDate,
) -> RollupResult<Option<MonthlySummary>> {
    let weeks = store
        .weekly_summaries(user_id, exercise_name, month_start, month_end(month_start))
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Monthly, user_id, exercise_name, e))?;

    if weeks.is_empty() {
        tracing::debug!(user_id, exercise_name, %month_start, "No weekly rows found, skipping monthly rollup");
        return Ok(None);
    }

    let summary = summarize_weeks(user_id, exercise_name, month_start, &weeks, Utc::now());

    store
        .upsert_monthly(&summary)
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Monthly, user_id, exercise_name, e))?;

    tracing::debug!(
        user_id,
        exercise_name,
        %month_start,
        weeks = weeks.len(),
        total_volume = ?summary.total_volume,
        max_one_rm = ?summary.max_one_rm,
        session_count = summary.session_count,
        consistency_score = summary.consistency_score,
        "Monthly rollup upserted"
    );

    Ok(Some(summary))
}

/// Reduce a month of weekly rows.
///
/// `total_volume` adds up the weekly *averages*. Weeks that straddle a month
/// boundary are counted only in the month their start date falls in.
pub fn summarize_weeks(
    user_id: i64,
    exercise_name: &str,
    month_start: NaiveDate,
    weeks: &[WeeklySummary],
    updated_at: DateTime<Utc>,
) -> MonthlySummary {
    let active_weeks = weeks.iter().filter(|w| w.session_count > 0).count();
    let consistency_score = if weeks.is_empty() {
        0.0
    } else {
        active_weeks as f64 / weeks.len() as f64
    };

    MonthlySummary {
        user_id,
        exercise_name: exercise_name.to_string(),
        month_start,
        total_volume: sum_present(weeks.iter().map(|w| w.avg_volume)),
        max_one_rm: max_present(weeks.iter().map(|w| w.max_one_rm)),
        session_count: weeks.iter().map(|w| w.session_count).sum(),
        consistency_score,
        updated_at,
    }
}

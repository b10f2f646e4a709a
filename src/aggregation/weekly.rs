use chrono::{DateTime, NaiveDate, Utc};

use super::calendar::week_end;
use super::{log_storage_failure, max_present, trend_slope, RollupLevel};
use crate::error::{RollupError, RollupResult};
use crate::models::{DailySummary, WeeklySummary};
use crate::store::RollupStore;

/// Recompute the weekly rollup from the daily rows in `[week_start, week_start + 6]`.
///
/// `week_start` is taken as given: a Wednesday produces a Wednesday-to-Tuesday
/// window stored under that Wednesday.
pub async fn aggregate_weekly(
    store: &dyn RollupStore,
    user_id: i64,
    exercise_name: &str,
    week_start: NaiveDate,
) -> RollupResult<Option<WeeklySummary>> {
    let last_day = week_end(week_start).ok_or(RollupError::DateOutOfRange(week_start))?;

    let days = store
        .daily_summaries(user_id, exercise_name, week_start, last_day)
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Weekly, user_id, exercise_name, e))?;

    if days.is_empty() {
        tracing::debug!(user_id, exercise_name, %week_start, "No daily rows found, skipping weekly rollup");
        return Ok(None);
    }

    let summary = summarize_days(user_id, exercise_name, week_start, &days, Utc::now());

    store
        .upsert_weekly(&summary)
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Weekly, user_id, exercise_name, e))?;

    tracing::debug!(
        user_id,
        exercise_name,
        %week_start,
        days = days.len(),
        avg_volume = ?summary.avg_volume,
        max_one_rm = ?summary.max_one_rm,
        session_count = summary.session_count,
        trend_slope = ?summary.trend_slope,
        "Weekly rollup upserted"
    );

    Ok(Some(summary))
}

/// Reduce a week of daily rows (oldest first).
///
/// Days without a volume are left out of both the average and the trend, so
/// the average divides by contributing days rather than by 7.
pub fn summarize_days(
    user_id: i64,
    exercise_name: &str,
    week_start: NaiveDate,
    days: &[DailySummary],
    updated_at: DateTime<Utc>,
) -> WeeklySummary {
    let volumes: Vec<f64> = days.iter().filter_map(|d| d.total_volume).collect();

    let avg_volume = if volumes.is_empty() {
        None
    } else {
        Some(volumes.iter().sum::<f64>() / volumes.len() as f64)
    };

    WeeklySummary {
        user_id,
        exercise_name: exercise_name.to_string(),
        week_start,
        avg_volume,
        max_one_rm: max_present(days.iter().map(|d| d.max_one_rm)),
        session_count: days.iter().map(|d| d.session_count).sum(),
        trend_slope: trend_slope(&volumes),
        updated_at,
    }
}

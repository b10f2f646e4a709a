use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use super::{log_storage_failure, max_present, sum_present, RollupLevel};
use crate::error::RollupResult;
use crate::models::{DailySummary, RawSetRecord};
use crate::store::RollupStore;

/// Recompute the daily rollup for one user/exercise/date from raw sets.
///
/// Returns `Ok(None)` without writing when the day has no sets. A row left over
/// from an earlier run (e.g. all sets since deleted) is not cleared.
pub async fn aggregate_daily(
    store: &dyn RollupStore,
    user_id: i64,
    exercise_name: &str,
    date: NaiveDate,
) -> RollupResult<Option<DailySummary>> {
    let sets = store
        .raw_sets(user_id, exercise_name, date)
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Daily, user_id, exercise_name, e))?;

    if sets.is_empty() {
        tracing::debug!(user_id, exercise_name, %date, "No sets found, skipping daily rollup");
        return Ok(None);
    }

    let summary = summarize_sets(user_id, exercise_name, date, &sets, Utc::now());

    store
        .upsert_daily(&summary)
        .await
        .inspect_err(|e| log_storage_failure(RollupLevel::Daily, user_id, exercise_name, e))?;

    tracing::debug!(
        user_id,
        exercise_name,
        %date,
        sets = sets.len(),
        total_volume = ?summary.total_volume,
        max_weight = ?summary.max_weight,
        max_one_rm = ?summary.max_one_rm,
        session_count = summary.session_count,
        "Daily rollup upserted"
    );

    Ok(Some(summary))
}

/// Reduce one day's sets. Absent values are skipped, never counted as zero.
pub fn summarize_sets(
    user_id: i64,
    exercise_name: &str,
    date: NaiveDate,
    sets: &[RawSetRecord],
    updated_at: DateTime<Utc>,
) -> DailySummary {
    let sessions: HashSet<i64> = sets.iter().map(|s| s.session_id).collect();

    DailySummary {
        user_id,
        exercise_name: exercise_name.to_string(),
        date,
        total_volume: sum_present(sets.iter().map(|s| s.volume_load)),
        max_weight: max_present(sets.iter().map(|s| s.weight)),
        max_one_rm: max_present(sets.iter().map(|s| s.one_rm_estimate)),
        session_count: sessions.len() as i64,
        updated_at,
    }
}

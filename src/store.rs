//! Storage seam for the rollup engine.
//!
//! The aggregators only need two things from storage: range reads of the layer
//! below, and an atomic insert-or-overwrite of one summary row by natural key.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::RollupResult;
use crate::models::{
    DailySummary, MonthlySummary, RawSetRecord, SessionExerciseDate, WeeklySummary,
};

#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Distinct (resolved exercise name, workout date) pairs currently attached to a session
    async fn session_exercise_dates(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> RollupResult<Vec<SessionExerciseDate>>;

    /// All sets for a user/exercise whose owning session falls on `date`
    async fn raw_sets(
        &self,
        user_id: i64,
        exercise_name: &str,
        date: NaiveDate,
    ) -> RollupResult<Vec<RawSetRecord>>;

    async fn upsert_daily(&self, summary: &DailySummary) -> RollupResult<()>;

    /// Daily rows with `date` in `[from, to]`, oldest first
    async fn daily_summaries(
        &self,
        user_id: i64,
        exercise_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RollupResult<Vec<DailySummary>>;

    async fn upsert_weekly(&self, summary: &WeeklySummary) -> RollupResult<()>;

    /// Weekly rows with `week_start` in `[from, to]`, oldest first
    async fn weekly_summaries(
        &self,
        user_id: i64,
        exercise_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RollupResult<Vec<WeeklySummary>>;

    async fn upsert_monthly(&self, summary: &MonthlySummary) -> RollupResult<()>;

    /// Monthly rows with `month_start` in `[from, to]`, oldest first
    async fn monthly_summaries(
        &self,
        user_id: i64,
        exercise_name: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RollupResult<Vec<MonthlySummary>>;
}

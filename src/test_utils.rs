//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Database setup/teardown
//! - Session seeding
//! - Mock data factories
//! - An instrumented store for counting, failing and pausing storage calls

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tokio::sync::Notify;

use crate::db::SqliteStore;
use crate::error::{RollupError, RollupResult};
use crate::models::{
  DailySummary, MonthlySummary, RawSetRecord, SessionExerciseDate, WeeklySummary,
};
use crate::store::RollupStore;

/// ---------------------------------------------------------------------------
/// Database Test Utilities
/// ---------------------------------------------------------------------------

/// Create an in-memory SQLite database for testing
/// Runs all migrations and returns a ready-to-use pool
///
/// Uses max_connections(1) to prevent multiple pool connections from creating
/// isolated in-memory databases, which would cause intermittent test failures
pub async fn setup_test_db() -> SqlitePool {
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .max_connections(1)
    .connect("sqlite::memory:")
    .await
    .expect("Failed to create in-memory database");

  sqlx::migrate!("./migrations")
    .run(&pool)
    .await
    .expect("Failed to run migrations");

  pool
}

/// Close a test database pool
pub async fn teardown_test_db(pool: SqlitePool) {
  pool.close().await;
}

/// One set to seed; `None` columns are stored as NULL
#[derive(Debug, Clone, Copy, Default)]
pub struct SetSeed {
  pub weight: Option<f64>,
  pub reps: Option<i64>,
  pub one_rm_estimate: Option<f64>,
  pub volume_load: Option<f64>,
}

impl SetSeed {
  pub fn new(
    weight: Option<f64>,
    reps: Option<i64>,
    one_rm_estimate: Option<f64>,
    volume_load: Option<f64>,
  ) -> Self {
    Self {
      weight,
      reps,
      one_rm_estimate,
      volume_load,
    }
  }

  pub fn volume(volume_load: f64) -> Self {
    Self {
      volume_load: Some(volume_load),
      ..Default::default()
    }
  }
}

/// (entered name, canonical name, sets)
pub type ExerciseSeed<'a> = (&'a str, Option<&'a str>, Vec<SetSeed>);

/// Insert a session with its exercises and sets
/// Returns the new session id
pub async fn seed_session(
  pool: &SqlitePool,
  user_id: i64,
  workout_date: NaiveDate,
  exercises: &[ExerciseSeed<'_>],
) -> i64 {
  let session_id = sqlx::query("INSERT INTO workout_sessions (user_id, workout_date) VALUES (?1, ?2)")
    .bind(user_id)
    .bind(workout_date)
    .execute(pool)
    .await
    .expect("Failed to insert test session")
    .last_insert_rowid();

  insert_exercises(pool, session_id, exercises).await;

  session_id
}

/// Drop every exercise of a session and insert a new list, like a bulk edit would
pub async fn replace_session_exercises(
  pool: &SqlitePool,
  session_id: i64,
  exercises: &[ExerciseSeed<'_>],
) {
  sqlx::query(
    "DELETE FROM exercise_sets WHERE session_exercise_id IN (SELECT id FROM session_exercises WHERE session_id = ?1)",
  )
  .bind(session_id)
  .execute(pool)
  .await
  .expect("Failed to delete test sets");

  sqlx::query("DELETE FROM session_exercises WHERE session_id = ?1")
    .bind(session_id)
    .execute(pool)
    .await
    .expect("Failed to delete test exercises");

  insert_exercises(pool, session_id, exercises).await;
}

async fn insert_exercises(pool: &SqlitePool, session_id: i64, exercises: &[ExerciseSeed<'_>]) {
  for (position, (name, canonical, sets)) in exercises.iter().enumerate() {
    let exercise_id = sqlx::query(
      r#"
      INSERT INTO session_exercises (session_id, exercise_name, canonical_name, position)
      VALUES (?1, ?2, ?3, ?4)
      "#,
    )
    .bind(session_id)
    .bind(*name)
    .bind(*canonical)
    .bind(position as i64)
    .execute(pool)
    .await
    .expect("Failed to insert test exercise")
    .last_insert_rowid();

    for set in sets {
      sqlx::query(
        r#"
        INSERT INTO exercise_sets (
          session_exercise_id, weight, reps, sets, one_rm_estimate, volume_load
        )
        VALUES (?1, ?2, ?3, 1, ?4, ?5)
        "#,
      )
      .bind(exercise_id)
      .bind(set.weight)
      .bind(set.reps)
      .bind(set.one_rm_estimate)
      .bind(set.volume_load)
      .execute(pool)
      .await
      .expect("Failed to insert test set");
    }
  }
}

/// ---------------------------------------------------------------------------
/// Mock Data Factories
/// ---------------------------------------------------------------------------

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

pub fn mock_raw_set(session_id: i64) -> RawSetRecord {
  RawSetRecord {
    user_id: 1,
    exercise_name: "Bench Press".to_string(),
    session_id,
    workout_date: date(2025, 3, 4),
    weight: Some(80.0),
    reps: Some(8),
    sets: Some(1),
    one_rm_estimate: Some(101.3),
    volume_load: Some(640.0),
  }
}

pub fn mock_daily_summary(day: NaiveDate) -> DailySummary {
  DailySummary {
    user_id: 1,
    exercise_name: "Squat".to_string(),
    date: day,
    total_volume: Some(1000.0),
    max_weight: Some(100.0),
    max_one_rm: Some(120.0),
    session_count: 1,
    updated_at: Utc::now(),
  }
}

pub fn mock_weekly_summary(week_start: NaiveDate) -> WeeklySummary {
  WeeklySummary {
    user_id: 1,
    exercise_name: "Squat".to_string(),
    week_start,
    avg_volume: Some(1000.0),
    max_one_rm: Some(120.0),
    session_count: 1,
    trend_slope: None,
    updated_at: Utc::now(),
  }
}

/// ---------------------------------------------------------------------------
/// Instrumented Store
/// ---------------------------------------------------------------------------

/// Which summary upsert to fail for the configured exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
  Daily,
  Weekly,
  Monthly,
}

/// How an injected failure surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
  Error,
  Panic,
}

/// Where the first matching call parks until the test releases it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAt {
  /// Before the daily stage reads raw sets
  RawSets,
  /// After the weekly stage has read its daily rows, before it writes
  DailyRowsRead,
}

/// Wraps a `SqliteStore`, counting successful upserts per level.
///
/// Optionally fails (or panics in) one level's upsert for one exercise, or
/// parks the first call at a `GateAt` point until the test releases it.
pub struct InstrumentedStore {
  inner: SqliteStore,
  daily_upserts: AtomicUsize,
  weekly_upserts: AtomicUsize,
  monthly_upserts: AtomicUsize,
  failure: Option<(String, FailAt, Fault)>,
  gate: Option<GateAt>,
  gate_armed: AtomicBool,
  gate_entered: Notify,
  gate_release: Notify,
}

impl InstrumentedStore {
  pub fn new(inner: SqliteStore) -> Self {
    Self {
      inner,
      daily_upserts: AtomicUsize::new(0),
      weekly_upserts: AtomicUsize::new(0),
      monthly_upserts: AtomicUsize::new(0),
      failure: None,
      gate: None,
      gate_armed: AtomicBool::new(false),
      gate_entered: Notify::new(),
      gate_release: Notify::new(),
    }
  }

  pub fn failing(mut self, exercise_name: &str, at: FailAt) -> Self {
    self.failure = Some((exercise_name.to_string(), at, Fault::Error));
    self
  }

  pub fn panicking(mut self, exercise_name: &str, at: FailAt) -> Self {
    self.failure = Some((exercise_name.to_string(), at, Fault::Panic));
    self
  }

  pub fn gated(mut self, at: GateAt) -> Self {
    self.gate = Some(at);
    self.gate_armed.store(true, Ordering::SeqCst);
    self
  }

  pub fn inner(&self) -> &SqliteStore {
    &self.inner
  }

  /// Resolves once the first call at the gate point is parked
  pub async fn wait_until_gated(&self) {
    self.gate_entered.notified().await;
  }

  pub fn release_gate(&self) {
    self.gate_release.notify_one();
  }

  pub fn daily_upserts(&self) -> usize {
    self.daily_upserts.load(Ordering::SeqCst)
  }

  pub fn weekly_upserts(&self) -> usize {
    self.weekly_upserts.load(Ordering::SeqCst)
  }

  pub fn monthly_upserts(&self) -> usize {
    self.monthly_upserts.load(Ordering::SeqCst)
  }

  async fn pass_gate(&self, at: GateAt) {
    if self.gate == Some(at) && self.gate_armed.swap(false, Ordering::SeqCst) {
      self.gate_entered.notify_one();
      self.gate_release.notified().await;
    }
  }

  fn check_failure(&self, exercise_name: &str, at: FailAt) -> RollupResult<()> {
    match &self.failure {
      Some((name, level, Fault::Panic)) if name == exercise_name && *level == at => {
        panic!("injected {:?} panic for {}", at, exercise_name)
      }
      Some((name, level, Fault::Error)) if name == exercise_name && *level == at => Err(
        RollupError::Storage(sqlx::Error::Protocol(format!(
          "injected {:?} failure for {}",
          at, exercise_name
        ))),
      ),
      _ => Ok(()),
    }
  }
}

#[async_trait]
impl RollupStore for InstrumentedStore {
  async fn session_exercise_dates(
    &self,
    session_id: i64,
    user_id: i64,
  ) -> RollupResult<Vec<SessionExerciseDate>> {
    self.inner.session_exercise_dates(session_id, user_id).await
  }

  async fn raw_sets(
    &self,
    user_id: i64,
    exercise_name: &str,
    date: NaiveDate,
  ) -> RollupResult<Vec<RawSetRecord>> {
    self.pass_gate(GateAt::RawSets).await;
    self.inner.raw_sets(user_id, exercise_name, date).await
  }

  async fn upsert_daily(&self, summary: &DailySummary) -> RollupResult<()> {
    self.check_failure(&summary.exercise_name, FailAt::Daily)?;
    self.inner.upsert_daily(summary).await?;
    self.daily_upserts.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn daily_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<DailySummary>> {
    let rows = self.inner.daily_summaries(user_id, exercise_name, from, to).await?;
    self.pass_gate(GateAt::DailyRowsRead).await;
    Ok(rows)
  }

  async fn upsert_weekly(&self, summary: &WeeklySummary) -> RollupResult<()> {
    self.check_failure(&summary.exercise_name, FailAt::Weekly)?;
    self.inner.upsert_weekly(summary).await?;
    self.weekly_upserts.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn weekly_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<WeeklySummary>> {
    self.inner.weekly_summaries(user_id, exercise_name, from, to).await
  }

  async fn upsert_monthly(&self, summary: &MonthlySummary) -> RollupResult<()> {
    self.check_failure(&summary.exercise_name, FailAt::Monthly)?;
    self.inner.upsert_monthly(summary).await?;
    self.monthly_upserts.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn monthly_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<MonthlySummary>> {
    self.inner.monthly_summaries(user_id, exercise_name, from, to).await
  }
}

/// ---------------------------------------------------------------------------
/// Test Macros
/// ---------------------------------------------------------------------------

/// Assert two floats are approximately equal within a tolerance
#[macro_export]
macro_rules! assert_approx_eq {
  ($left:expr, $right:expr, $tolerance:expr) => {
    let diff = ($left - $right).abs();
    assert!(
      diff < $tolerance,
      "Values not approximately equal: {} vs {} (diff: {}, tolerance: {})",
      $left,
      $right,
      diff,
      $tolerance
    );
  };
}

/// ---------------------------------------------------------------------------
/// Tests for Test Utilities
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_setup_db_creates_schema() {
    let pool = setup_test_db().await;

    let tables: Vec<(String,)> = sqlx::query_as(
      r#"
      SELECT name FROM sqlite_master
      WHERE type = 'table' AND name IN (
        'workout_sessions', 'session_exercises', 'exercise_sets',
        'daily_exercise_summaries', 'weekly_exercise_summaries', 'monthly_exercise_summaries'
      )
      "#,
    )
    .fetch_all(&pool)
    .await
    .expect("Failed to query tables");

    assert_eq!(tables.len(), 6, "Expected 6 tables, got {}", tables.len());

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_seed_session_inserts_sets() {
    let pool = setup_test_db().await;

    let session_id = seed_session(
      &pool,
      1,
      date(2025, 3, 4),
      &[
        ("Squat", None, vec![SetSeed::volume(100.0), SetSeed::volume(200.0)]),
        ("Row", None, vec![SetSeed::default()]),
      ],
    )
    .await;

    let count: i64 = sqlx::query_scalar(
      r#"
      SELECT COUNT(*) FROM exercise_sets es
      JOIN session_exercises se ON se.id = es.session_exercise_id
      WHERE se.session_id = ?1
      "#,
    )
    .bind(session_id)
    .fetch_one(&pool)
    .await
    .expect("Failed to count sets");

    assert_eq!(count, 3);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  async fn test_instrumented_store_injects_failure() {
    let pool = setup_test_db().await;
    let store = InstrumentedStore::new(SqliteStore::new(pool.clone())).failing("Squat", FailAt::Daily);

    let err = store.upsert_daily(&mock_daily_summary(date(2025, 3, 4))).await;
    assert!(err.is_err());
    assert_eq!(store.daily_upserts(), 0);

    let mut other = mock_daily_summary(date(2025, 3, 4));
    other.exercise_name = "Row".to_string();
    store.upsert_daily(&other).await.expect("Other exercises should pass through");
    assert_eq!(store.daily_upserts(), 1);

    teardown_test_db(pool).await;
  }

  #[tokio::test]
  #[should_panic(expected = "injected Weekly panic for Squat")]
  async fn test_instrumented_store_injects_panic() {
    let pool = setup_test_db().await;
    let store = InstrumentedStore::new(SqliteStore::new(pool)).panicking("Squat", FailAt::Weekly);

    let _ = store.upsert_weekly(&mock_weekly_summary(date(2025, 3, 3))).await;
  }
}

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::RollupConfig;
use crate::error::RollupResult;
use crate::models::{
  DailySummary, MonthlySummary, RawSetRecord, SessionExerciseDate, WeeklySummary,
};
use crate::store::RollupStore;

pub type DbPool = SqlitePool;

/// Initialize the database connection pool and run migrations
pub async fn initialize_db(config: &RollupConfig) -> RollupResult<DbPool> {
  tracing::info!(url = %config.database_url, "Initializing rollup database");

  let pool = SqlitePoolOptions::new()
    .max_connections(config.max_connections)
    .connect(&config.database_url)
    .await?;

  sqlx::migrate!("./migrations").run(&pool).await?;

  tracing::info!("Rollup database initialized");

  Ok(pool)
}

/// ---------------------------------------------------------------------------
/// SQLite Store
/// ---------------------------------------------------------------------------

/// `RollupStore` backed by the application's SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }
}

#[async_trait]
impl RollupStore for SqliteStore {
  async fn session_exercise_dates(
    &self,
    session_id: i64,
    user_id: i64,
  ) -> RollupResult<Vec<SessionExerciseDate>> {
    let pairs = sqlx::query_as::<_, SessionExerciseDate>(
      r#"
      SELECT DISTINCT
        COALESCE(se.canonical_name, se.exercise_name) AS exercise_name,
        ws.workout_date AS workout_date
      FROM session_exercises se
      JOIN workout_sessions ws ON ws.id = se.session_id
      WHERE se.session_id = ?1 AND ws.user_id = ?2
      ORDER BY exercise_name, workout_date
      "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    Ok(pairs)
  }

  async fn raw_sets(
    &self,
    user_id: i64,
    exercise_name: &str,
    date: NaiveDate,
  ) -> RollupResult<Vec<RawSetRecord>> {
    let sets = sqlx::query_as::<_, RawSetRecord>(
      r#"
      SELECT
        ws.user_id AS user_id,
        COALESCE(se.canonical_name, se.exercise_name) AS exercise_name,
        ws.id AS session_id,
        ws.workout_date AS workout_date,
        es.weight, es.reps, es.sets, es.one_rm_estimate, es.volume_load
      FROM exercise_sets es
      JOIN session_exercises se ON se.id = es.session_exercise_id
      JOIN workout_sessions ws ON ws.id = se.session_id
      WHERE ws.user_id = ?1
        AND COALESCE(se.canonical_name, se.exercise_name) = ?2
        AND ws.workout_date = ?3
      ORDER BY es.id
      "#,
    )
    .bind(user_id)
    .bind(exercise_name)
    .bind(date)
    .fetch_all(&self.pool)
    .await?;

    Ok(sets)
  }

  async fn upsert_daily(&self, summary: &DailySummary) -> RollupResult<()> {
    sqlx::query(
      r#"
      INSERT INTO daily_exercise_summaries (
        user_id, exercise_name, date, total_volume, max_weight,
        max_one_rm, session_count, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(user_id, exercise_name, date) DO UPDATE SET
        total_volume = excluded.total_volume,
        max_weight = excluded.max_weight,
        max_one_rm = excluded.max_one_rm,
        session_count = excluded.session_count,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(summary.user_id)
    .bind(&summary.exercise_name)
    .bind(summary.date)
    .bind(summary.total_volume)
    .bind(summary.max_weight)
    .bind(summary.max_one_rm)
    .bind(summary.session_count)
    .bind(summary.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn daily_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<DailySummary>> {
    let rows = sqlx::query_as::<_, DailySummary>(
      r#"
      SELECT user_id, exercise_name, date, total_volume, max_weight,
             max_one_rm, session_count, updated_at
      FROM daily_exercise_summaries
      WHERE user_id = ?1 AND exercise_name = ?2 AND date BETWEEN ?3 AND ?4
      ORDER BY date ASC
      "#,
    )
    .bind(user_id)
    .bind(exercise_name)
    .bind(from)
    .bind(to)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }

  async fn upsert_weekly(&self, summary: &WeeklySummary) -> RollupResult<()> {
    sqlx::query(
      r#"
      INSERT INTO weekly_exercise_summaries (
        user_id, exercise_name, week_start, avg_volume, max_one_rm,
        session_count, trend_slope, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(user_id, exercise_name, week_start) DO UPDATE SET
        avg_volume = excluded.avg_volume,
        max_one_rm = excluded.max_one_rm,
        session_count = excluded.session_count,
        trend_slope = excluded.trend_slope,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(summary.user_id)
    .bind(&summary.exercise_name)
    .bind(summary.week_start)
    .bind(summary.avg_volume)
    .bind(summary.max_one_rm)
    .bind(summary.session_count)
    .bind(summary.trend_slope)
    .bind(summary.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn weekly_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<WeeklySummary>> {
    let rows = sqlx::query_as::<_, WeeklySummary>(
      r#"
      SELECT user_id, exercise_name, week_start, avg_volume, max_one_rm,
             session_count, trend_slope, updated_at
      FROM weekly_exercise_summaries
      WHERE user_id = ?1 AND exercise_name = ?2 AND week_start BETWEEN ?3 AND ?4
      ORDER BY week_start ASC
      "#,
    )
    .bind(user_id)
    .bind(exercise_name)
    .bind(from)
    .bind(to)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }

  async fn upsert_monthly(&self, summary: &MonthlySummary) -> RollupResult<()> {
    sqlx::query(
      r#"
      INSERT INTO monthly_exercise_summaries (
        user_id, exercise_name, month_start, total_volume, max_one_rm,
        session_count, consistency_score, updated_at
      )
      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
      ON CONFLICT(user_id, exercise_name, month_start) DO UPDATE SET
        total_volume = excluded.total_volume,
        max_one_rm = excluded.max_one_rm,
        session_count = excluded.session_count,
        consistency_score = excluded.consistency_score,
        updated_at = excluded.updated_at
      "#,
    )
    .bind(summary.user_id)
    .bind(&summary.exercise_name)
    .bind(summary.month_start)
    .bind(summary.total_volume)
    .bind(summary.max_one_rm)
    .bind(summary.session_count)
    .bind(summary.consistency_score)
    .bind(summary.updated_at)
    .execute(&self.pool)
    .await?;

    Ok(())
  }

  async fn monthly_summaries(
    &self,
    user_id: i64,
    exercise_name: &str,
    from: NaiveDate,
    to: NaiveDate,
  ) -> RollupResult<Vec<MonthlySummary>> {
    let rows = sqlx::query_as::<_, MonthlySummary>(
      r#"
      SELECT user_id, exercise_name, month_start, total_volume, max_one_rm,
             session_count, consistency_score, updated_at
      FROM monthly_exercise_summaries
      WHERE user_id = ?1 AND exercise_name = ?2 AND month_start BETWEEN ?3 AND ?4
      ORDER BY month_start ASC
      "#,
    )
    .bind(user_id)
    .bind(exercise_name)
    .bind(from)
    .bind(to)
    .fetch_all(&self.pool)
    .await?;

    Ok(rows)
  }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One logged set, joined with its owning session and exercise.
///
/// Read-only input for the daily rollup. Every numeric column may be NULL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawSetRecord {
  pub user_id: i64,
  pub exercise_name: String,
  pub session_id: i64,
  pub workout_date: NaiveDate,
  pub weight: Option<f64>,
  pub reps: Option<i64>,
  pub sets: Option<i64>,
  pub one_rm_estimate: Option<f64>,
  pub volume_load: Option<f64>,
}

/// A distinct (resolved exercise, workout date) pair touched by a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionExerciseDate {
  pub exercise_name: String,
  pub workout_date: NaiveDate,
}

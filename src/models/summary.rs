use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Per-day rollup keyed by (user_id, exercise_name, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailySummary {
  pub user_id: i64,
  pub exercise_name: String,
  pub date: NaiveDate,
  pub total_volume: Option<f64>,
  pub max_weight: Option<f64>,
  pub max_one_rm: Option<f64>,
  /// Distinct sessions contributing sets that day, not the set count
  pub session_count: i64,
  pub updated_at: DateTime<Utc>,
}

/// Per-week rollup keyed by (user_id, exercise_name, week_start)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklySummary {
  pub user_id: i64,
  pub exercise_name: String,
  pub week_start: NaiveDate,
  pub avg_volume: Option<f64>,
  pub max_one_rm: Option<f64>,
  pub session_count: i64,
  /// NULL unless at least two days contributed a volume
  pub trend_slope: Option<f64>,
  pub updated_at: DateTime<Utc>,
}

/// Per-month rollup keyed by (user_id, exercise_name, month_start)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MonthlySummary {
  pub user_id: i64,
  pub exercise_name: String,
  pub month_start: NaiveDate,
  /// Sum of the weekly averages, not of raw daily totals
  pub total_volume: Option<f64>,
  pub max_one_rm: Option<f64>,
  pub session_count: i64,
  pub consistency_score: f64,
  pub updated_at: DateTime<Utc>,
}

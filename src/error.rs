use chrono::NaiveDate;

use crate::config::ConfigError;

/// ---------------------------------------------------------------------------
/// Error Handling
/// ---------------------------------------------------------------------------

/// Errors surfaced by the aggregators and storage layer.
///
/// "No rows to aggregate" is deliberately absent: it is reported as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
  #[error("Storage error: {0}")]
  Storage(#[from] sqlx::Error),

  #[error("Migration failed: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("Date {0} has no week or month boundary inside the supported calendar range")]
  DateOutOfRange(NaiveDate),
}

pub type RollupResult<T> = Result<T, RollupError>;

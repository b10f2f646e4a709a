use chrono::Weekday;
use std::env;

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const DATABASE_URL_VAR: &str = "ROLLUP_DATABASE_URL";
const MAX_CONNECTIONS_VAR: &str = "ROLLUP_MAX_CONNECTIONS";
const WEEK_START_VAR: &str = "ROLLUP_WEEK_START";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid value for {name}: {value}")]
  InvalidValue { name: String, value: String },
}

/// Runtime settings for the rollup engine.
///
/// The binary calls `dotenvy::dotenv()` first, so values may come from a `.env` file.
#[derive(Debug, Clone)]
pub struct RollupConfig {
  pub database_url: String,
  pub max_connections: u32,
  /// First day of a rollup week. Weekly keys are derived with this.
  pub week_start: Weekday,
}

impl RollupConfig {
  /// Config for `database_url` with default pool size and week start
  pub fn new(database_url: impl Into<String>) -> Self {
    Self {
      database_url: database_url.into(),
      max_connections: DEFAULT_MAX_CONNECTIONS,
      week_start: Weekday::Mon,
    }
  }

  pub fn from_env() -> Result<Self, ConfigError> {
    let database_url = env::var(DATABASE_URL_VAR)
      .map_err(|_| ConfigError::MissingConfig(DATABASE_URL_VAR.into()))?;

    let max_connections = match env::var(MAX_CONNECTIONS_VAR) {
      Ok(raw) => match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return Err(invalid(MAX_CONNECTIONS_VAR, raw)),
      },
      Err(_) => DEFAULT_MAX_CONNECTIONS,
    };

    let week_start = match env::var(WEEK_START_VAR) {
      Ok(raw) => raw
        .trim()
        .parse::<Weekday>()
        .map_err(|_| invalid(WEEK_START_VAR, raw))?,
      Err(_) => Weekday::Mon,
    };

    Ok(Self {
      max_connections,
      week_start,
      ..Self::new(database_url)
    })
  }
}

fn invalid(name: &str, value: String) -> ConfigError {
  ConfigError::InvalidValue {
    name: name.to_string(),
    value,
  }
}

//! Pre-computed exercise rollups for progress tracking.
//!
//! Raw sets are reduced into daily summaries, daily into weekly, weekly into
//! monthly. The session subsystem calls
//! [`AggregationCoordinator::on_session_change`] after every saved edit and the
//! coordinator refreshes the three levels for each touched exercise/date.

pub mod aggregation;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod store;

#[cfg(test)]
mod test_utils;

pub use aggregation::{
  aggregate_daily, aggregate_monthly, aggregate_weekly, AggregationCoordinator, CascadeOutcome,
  ProcessingKey, TriggerReport,
};
pub use config::{ConfigError, RollupConfig};
pub use db::{initialize_db, SqliteStore};
pub use error::{RollupError, RollupResult};
pub use store::RollupStore;

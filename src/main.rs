//! Manual entry point for the rollup engine.
//!
//! Normally the session subsystem drives the coordinator in-process; this
//! binary exists to replay a trigger or recompute one key by hand.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use trainer_rollups::{
  initialize_db, AggregationCoordinator, RollupConfig, RollupResult, SqliteStore,
};

#[derive(Debug, Parser)]
#[command(name = "rollups", version, about = "Recompute workout exercise rollups")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Refresh every rollup touched by a session, as the session subsystem would
  Trigger {
    #[arg(long)]
    session_id: i64,
    #[arg(long)]
    user_id: i64,
  },
  /// Recompute daily, weekly and monthly rollups for one exercise/date
  Refresh {
    #[arg(long)]
    user_id: i64,
    #[arg(long)]
    exercise: String,
    /// Workout date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,
  },
}

#[tokio::main]
async fn main() -> ExitCode {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!(error = %e, "Rollup command failed");
      ExitCode::FAILURE
    }
  }
}

async fn run(cli: Cli) -> RollupResult<()> {
  let config = RollupConfig::from_env()?;
  let store = Arc::new(SqliteStore::new(initialize_db(&config).await?));
  let coordinator = AggregationCoordinator::new(store.clone(), config.week_start);

  match cli.command {
    Command::Trigger {
      session_id,
      user_id,
    } => {
      let report = coordinator.on_session_change(session_id, user_id).await;
      print_json(&report);
    }
    Command::Refresh {
      user_id,
      exercise,
      date,
    } => {
      let outcome = coordinator.refresh_key(user_id, &exercise, date).await?;
      print_json(&serde_json::json!({
        "user_id": user_id,
        "exercise_name": exercise,
        "date": date,
        "outcome": outcome,
      }));
    }
  }

  store.pool().close().await;
  Ok(())
}

fn print_json<T: Serialize>(value: &T) {
  match serde_json::to_string_pretty(value) {
    Ok(json) => println!("{}", json),
    Err(e) => tracing::warn!(error = %e, "Failed to serialize command output"),
  }
}

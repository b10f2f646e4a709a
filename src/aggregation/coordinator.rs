//! Entry point the session subsystem calls after mutating a session's exercises.
//!
//! For every (exercise, date) the session touches, the coordinator runs
//! daily → weekly → monthly in order, each level finishing its write before the
//! next one reads. Failures are logged and contained per key; nothing is
//! returned as an error to the caller saving the workout.
//!
//! Two kinds of key are tracked while a cascade runs:
//! - the triggering `(user, exercise, date)`, which is claimed outright so an
//!   identical trigger already in flight is skipped;
//! - the derived `(user, exercise, week_start)` and `(user, exercise,
//!   month_start)` periods, which several dates share. Their stages queue on a
//!   per-period lock, so each weekly or monthly read-and-write sees every daily
//!   or weekly row committed by the cascades that held the lock before it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{NaiveDate, Weekday};
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::calendar::{month_start_for, week_end, week_start_for};
use super::{aggregate_daily, aggregate_monthly, aggregate_weekly, RollupLevel};
use crate::error::{RollupError, RollupResult};
use crate::store::RollupStore;

/// Identity of one cascade: the finest-grained key it was triggered for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProcessingKey {
    pub user_id: i64,
    pub exercise_name: String,
    pub date: NaiveDate,
}

/// A weekly or monthly row that every date inside the period rolls up into
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PeriodKey {
    level: RollupLevel,
    user_id: i64,
    exercise_name: String,
    period_start: NaiveDate,
}

impl PeriodKey {
    fn derived(level: RollupLevel, key: &ProcessingKey, period_start: NaiveDate) -> Self {
        Self {
            level,
            user_id: key.user_id,
            exercise_name: key.exercise_name.clone(),
            period_start,
        }
    }
}

type PeriodLocks = Mutex<HashMap<PeriodKey, Arc<AsyncMutex<()>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeOutcome {
    /// All three levels ran (a level with no input rows counts as done)
    Completed,
    /// An identical key was already in flight in this process
    Skipped,
}

/// What one `on_session_change` call did. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerReport {
    pub session_id: i64,
    pub user_id: i64,
    pub keys_resolved: usize,
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Cascading, deduplicating rollup trigger.
///
/// Build one per process and share it behind an `Arc`. Deduplication and
/// period locking only cover this instance.
pub struct AggregationCoordinator {
    store: Arc<dyn RollupStore>,
    week_start: Weekday,
    processing: Mutex<HashSet<ProcessingKey>>,
    periods: PeriodLocks,
}

impl AggregationCoordinator {
    pub fn new(store: Arc<dyn RollupStore>, week_start: Weekday) -> Self {
        Self {
            store,
            week_start,
            processing: Mutex::new(HashSet::new()),
            periods: Mutex::new(HashMap::new()),
        }
    }

    /// Refresh every rollup touched by a session.
    ///
    /// Keys are re-read from storage rather than taken from the caller, so a
    /// bulk replace of the session's exercises is handled like any other edit.
    pub async fn on_session_change(&self, session_id: i64, user_id: i64) -> TriggerReport {
        let mut report = TriggerReport {
            session_id,
            user_id,
            ..Default::default()
        };

        let pairs = match self.store.session_exercise_dates(session_id, user_id).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::error!(session_id, user_id, error = %e, "Failed to resolve exercises for rollup");
                report.failed += 1;
                return report;
            }
        };

        report.keys_resolved = pairs.len();

        for pair in pairs {
            let key = ProcessingKey {
                user_id,
                exercise_name: pair.exercise_name,
                date: pair.workout_date,
            };

            match self.run_cascade(&key).await {
                Ok(CascadeOutcome::Completed) => report.completed += 1,
                Ok(CascadeOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        session_id,
                        user_id,
                        exercise_name = %key.exercise_name,
                        date = %key.date,
                        error = %e,
                        "Rollup cascade failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(
            session_id,
            user_id,
            keys = report.keys_resolved,
            completed = report.completed,
            skipped = report.skipped,
            failed = report.failed,
            "Session rollups refreshed"
        );

        report
    }

    /// Run the deduplicated cascade for a single key and surface any error.
    pub async fn refresh_key(
        &self,
        user_id: i64,
        exercise_name: &str,
        date: NaiveDate,
    ) -> RollupResult<CascadeOutcome> {
        let key = ProcessingKey {
            user_id,
            exercise_name: exercise_name.to_string(),
            date,
        };
        self.run_cascade(&key).await
    }

    /// Whether a key is currently being aggregated by this instance
    pub fn is_processing(&self, key: &ProcessingKey) -> bool {
        self.processing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    async fn run_cascade(&self, key: &ProcessingKey) -> RollupResult<CascadeOutcome> {
        let Some(_guard) = self.claim(key) else {
            tracing::debug!(
                user_id = key.user_id,
                exercise_name = %key.exercise_name,
                date = %key.date,
                "Rollup already in flight, skipping"
            );
            return Ok(CascadeOutcome::Skipped);
        };

        let store = self.store.as_ref();
        // Reject dates whose week cannot be represented before writing anything
        let week_start = week_start_for(key.date, self.week_start)
            .filter(|start| week_end(*start).is_some())
            .ok_or(RollupError::DateOutOfRange(key.date))?;
        let month_start = month_start_for(key.date);

        aggregate_daily(store, key.user_id, &key.exercise_name, key.date).await?;

        {
            let _week = self
                .lock_period(PeriodKey::derived(RollupLevel::Weekly, key, week_start))
                .await;
            aggregate_weekly(store, key.user_id, &key.exercise_name, week_start).await?;
        }

        let _month = self
            .lock_period(PeriodKey::derived(RollupLevel::Monthly, key, month_start))
            .await;
        aggregate_monthly(store, key.user_id, &key.exercise_name, month_start).await?;

        Ok(CascadeOutcome::Completed)
    }

    /// Insert `key` into the in-flight set, or `None` if it is already there
    fn claim(&self, key: &ProcessingKey) -> Option<ProcessingGuard<'_>> {
        let mut processing = self
            .processing
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if !processing.insert(key.clone()) {
            return None;
        }

        Some(ProcessingGuard {
            processing: &self.processing,
            key: key.clone(),
        })
    }

    /// Wait for exclusive use of a derived period, queueing behind any cascade
    /// already aggregating it
    async fn lock_period(&self, key: PeriodKey) -> PeriodGuard<'_> {
        let lock = self
            .periods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let mut guard = PeriodGuard {
            periods: &self.periods,
            key,
            lock,
            held: None,
        };
        guard.held = Some(guard.lock.clone().lock_owned().await);
        guard
    }
}

/// Removes its key from the in-flight set on every exit path
struct ProcessingGuard<'a> {
    processing: &'a Mutex<HashSet<ProcessingKey>>,
    key: ProcessingKey,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.processing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Holds (or waits for) a period lock; the last user removes the map entry
struct PeriodGuard<'a> {
    periods: &'a PeriodLocks,
    key: PeriodKey,
    lock: Arc<AsyncMutex<()>>,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for PeriodGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());

        let mut periods = self.periods.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this guard still reference the lock
        if Arc::strong_count(&self.lock) == 2 {
            periods.remove(&self.key);
        }
    }
}

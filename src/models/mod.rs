pub mod summary;
pub mod workout;

pub use summary::{DailySummary, MonthlySummary, WeeklySummary};
pub use workout::{RawSetRecord, SessionExerciseDate};

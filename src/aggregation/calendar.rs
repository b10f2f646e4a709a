//! Week and month boundaries for rollup keys.
//!
//! Only the coordinator derives boundaries; the weekly and monthly aggregators
//! take whatever start date they are given. Week arithmetic is checked and
//! returns `None` for dates whose week would leave chrono's supported range.

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};

/// Start of the week containing `date`, for weeks beginning on `week_start`
pub fn week_start_for(date: NaiveDate, week_start: Weekday) -> Option<NaiveDate> {
    let offset = (7 + date.weekday().num_days_from_monday()
        - week_start.num_days_from_monday())
        % 7;
    date.checked_sub_signed(Duration::days(offset as i64))
}

/// Last day covered by a week starting on `week_start`
pub fn week_end(week_start: NaiveDate) -> Option<NaiveDate> {
    week_start.checked_add_signed(Duration::days(6))
}

/// First day of the month containing `date`
pub fn month_start_for(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

/// Last day of the calendar month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    month_start_for(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

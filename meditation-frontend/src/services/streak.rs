//! Consecutive-day practice streak.

use crate::models::session::parse_timestamp;
use chrono::{Days, NaiveDate, Utc};
use std::collections::HashSet;

/// Streak as of the current UTC date.
pub fn current_streak<'a, I>(timestamps: I) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    streak_as_of(timestamps, Utc::now().date_naive())
}

/// Number of consecutive UTC calendar days with at least one session,
/// ending on `today` or, if nothing happened today yet, on the day before.
///
/// Order and duplicates do not matter. Unparseable timestamps are skipped.
pub fn streak_as_of<'a, I>(timestamps: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = &'a str>,
{
    let days: HashSet<NaiveDate> = timestamps
        .into_iter()
        .filter_map(|raw| {
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::debug!(timestamp = raw, "Skipping unparseable session timestamp");
            }
            parsed
        })
        .map(|at| at.date_naive())
        .collect();

    if days.is_empty() {
        return 0;
    }

    let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
        return 0;
    };

    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.checked_sub_days(Days::new(1)) {
            Some(previous) => cursor = previous,
            None => break,
        }
    }

    streak
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::datetime::{days_between, parse_date};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "percent", rename_all = "snake_case")]
pub enum ProgressState {
    /// Dates could not be parsed.
    Undetermined,
    Scheduled,
    InProgress(u8),
    Completed,
}

impl ProgressState {
    pub fn percent(&self) -> Option<u8> {
        match self {
            Self::Undetermined => None,
            Self::Scheduled => Some(0),
            Self::InProgress(pct) => Some(*pct),
            Self::Completed => Some(100),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Undetermined => "undetermined".to_string(),
            Self::Scheduled => "scheduled".to_string(),
            Self::InProgress(pct) => format!("{pct}%"),
            Self::Completed => "100%".to_string(),
        }
    }
}

/// Completion of a sheet date range as of `today`, or `None` when either
/// date fails to parse. Start dates resolve to the first day of their month,
/// end dates to the last.
pub fn progress_on(start: &str, end: &str, today: NaiveDate) -> Option<u8> {
    progress_state(start, end, today).percent()
}

/// [`progress_on`] with `now` truncated to its UTC calendar day.
pub fn progress(start: &str, end: &str, now: DateTime<Utc>) -> Option<u8> {
    progress_on(start, end, now.date_naive())
}

#[tracing::instrument(level = "trace")]
pub fn progress_state(start: &str, end: &str, today: NaiveDate) -> ProgressState {
    let (Some(start), Some(end)) = (parse_date(start, false), parse_date(end, true)) else {
        return ProgressState::Undetermined;
    };

    if today < start {
        return ProgressState::Scheduled;
    }
    if today > end {
        return ProgressState::Completed;
    }

    let total = days_between(start, end);
    if total <= 0 {
        return ProgressState::Completed;
    }

    let elapsed = days_between(start, today);
    let pct = ((elapsed * 100 + total / 2) / total).clamp(0, 100);
    match pct {
        100 => ProgressState::Completed,
        // `today` is within bounds and `pct` is clamped, so it fits in a u8.
        pct => ProgressState::InProgress(pct as u8),
    }
}

/// Share of `[start, end]` elapsed by `today`, in percent with one decimal.
pub fn span_progress(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> f64 {
    let total = days_between(start, end);
    if total <= 0 {
        return if today >= start { 100.0 } else { 0.0 };
    }

    let elapsed = days_between(start, today) as f64;
    let pct = (elapsed / total as f64 * 100.0).clamp(0.0, 100.0);
    (pct * 10.0).round() / 10.0
}

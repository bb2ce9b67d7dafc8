use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::datetime::{format_date, parse_date, year_span};
use crate::sheet::SheetRow;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("reference year {0} is outside the supported calendar")]
    ReferenceYear(i32),
}

/// Closed interval of calendar days. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LayoutError> {
        if start > end {
            return Err(LayoutError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", format_date(self.start), format_date(self.end))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Planned,
    InProgress,
    Done,
    Other(String),
    Unknown,
}

impl ItemStatus {
    pub fn from_label(raw: &str) -> Self {
        let label = raw.trim();
        match label.to_lowercase().as_str() {
            "" => Self::Unknown,
            "planned" | "scheduled" | "pending" | "예정" | "계획" => Self::Planned,
            "in progress" | "in-progress" | "ongoing" | "active" | "진행" | "진행중" => {
                Self::InProgress
            }
            "done" | "complete" | "completed" | "finished" | "완료" => Self::Done,
            _ => Self::Other(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Planned => "planned",
            Self::InProgress => "in progress",
            Self::Done => "done",
            Self::Other(label) => label,
            Self::Unknown => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleItem {
    /// Zero-based position in the input; correlates with the highlighted index.
    pub id: usize,
    pub name: String,
    pub description: String,
    pub range: TimeRange,
    pub status: ItemStatus,
    /// At least one side of `range` was substituted from the reference year.
    pub range_defaulted: bool,
}

impl ScheduleItem {
    pub fn new(id: usize, name: impl Into<String>, range: TimeRange) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            range,
            status: ItemStatus::Unknown,
            range_defaulted: false,
        }
    }

    /// Builds an item from a sheet row. When both dates are missing or
    /// unparseable the item spans `reference_year`. When only one is, the
    /// missing side takes the first/last day of the other side's year, so a
    /// defaulted range is never reversed.
    pub fn from_row(id: usize, row: &SheetRow, reference_year: i32) -> Result<Self, LayoutError> {
        let (year_start, year_end) =
            year_span(reference_year).ok_or(LayoutError::ReferenceYear(reference_year))?;

        let parsed_start = parse_date(&row.start, false);
        let parsed_end = parse_date(&row.end, true);
        let range_defaulted = parsed_start.is_none() || parsed_end.is_none();

        let (start, end) = match (parsed_start, parsed_end) {
            (Some(start), Some(end)) => (start, end),
            (Some(start), None) => {
                let end = year_span(start.year()).map_or(year_end, |(_, end)| end);
                (start, end.max(start))
            }
            (None, Some(end)) => {
                let start = year_span(end.year()).map_or(year_start, |(start, _)| start);
                (start.min(end), end)
            }
            (None, None) => (year_start, year_end),
        };
        let range = TimeRange::new(start, end)?;

        Ok(Self {
            id,
            name: row.name.clone(),
            description: row.description.clone(),
            range,
            status: ItemStatus::from_label(&row.status),
            range_defaulted,
        })
    }
}

/// A sheet row that could not be placed on the timeline.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExcludedItem {
    pub id: usize,
    pub name: String,
    pub reason: String,
}

#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn items_from_rows(
    rows: &[SheetRow],
    reference_year: i32,
) -> (Vec<ScheduleItem>, Vec<ExcludedItem>) {
    let mut items = Vec::with_capacity(rows.len());
    let mut excluded = Vec::new();

    for (id, row) in rows.iter().enumerate() {
        match ScheduleItem::from_row(id, row, reference_year) {
            Ok(item) => {
                if item.range_defaulted {
                    tracing::debug!(
                        id,
                        name = %item.name,
                        start = %row.start,
                        end = %row.end,
                        range = %item.range,
                        "substituted reference year for unparseable dates"
                    );
                }
                items.push(item);
            }
            Err(err) => {
                tracing::warn!(id, name = %row.name, error = %err, "excluding item from timeline");
                excluded.push(ExcludedItem {
                    id,
                    name: row.name.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    (items, excluded)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ItemStatus, LayoutError, ScheduleItem, TimeRange, items_from_rows};
    use crate::sheet::SheetRow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn row(name: &str, start: &str, end: &str) -> SheetRow {
        SheetRow {
            name: name.to_string(),
            description: format!("{name} description"),
            start: start.to_string(),
            end: end.to_string(),
            status: "진행중".to_string(),
        }
    }

    #[test]
    fn range_rejects_reversed_bounds() {
        let err = TimeRange::new(day(2024, 5, 1), day(2024, 4, 1)).expect_err("reversed");
        assert_eq!(
            err,
            LayoutError::InvalidRange {
                start: day(2024, 5, 1),
                end: day(2024, 4, 1)
            }
        );
        assert!(TimeRange::new(day(2024, 5, 1), day(2024, 5, 1)).is_ok());
    }

    #[test]
    fn overlap_is_inclusive_at_both_ends() {
        let a = TimeRange::new(day(2024, 1, 1), day(2024, 2, 29)).expect("range");
        let b = TimeRange::new(day(2024, 2, 29), day(2024, 3, 31)).expect("range");
        let c = TimeRange::new(day(2024, 3, 1), day(2024, 3, 31)).expect("range");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn row_dates_resolve_to_month_bounds() {
        let item = ScheduleItem::from_row(3, &row("KDI survey", "2024-02", "2024-02"), 2024)
            .expect("valid row");
        assert_eq!(item.id, 3);
        assert_eq!(item.range.start(), day(2024, 2, 1));
        assert_eq!(item.range.end(), day(2024, 2, 29));
        assert_eq!(item.status, ItemStatus::InProgress);
        assert!(!item.range_defaulted);
    }

    #[test]
    fn unparseable_dates_default_to_reference_year() {
        let item = ScheduleItem::from_row(0, &row("Logo", "", "soon"), 2025).expect("valid row");
        assert_eq!(item.range.start(), day(2025, 1, 1));
        assert_eq!(item.range.end(), day(2025, 12, 31));
        assert!(item.range_defaulted);

        let half = ScheduleItem::from_row(1, &row("Survey", "2025-03", "tbd"), 2025)
            .expect("valid row");
        assert_eq!(half.range.start(), day(2025, 3, 1));
        assert_eq!(half.range.end(), day(2025, 12, 31));
        assert!(half.range_defaulted);
    }

    #[test]
    fn one_sided_dates_outside_the_reference_year_stay_ordered() {
        let later = ScheduleItem::from_row(0, &row("Next phase", "2025-03", "tbd"), 2024)
            .expect("defaulted end keeps the range ordered");
        assert_eq!(later.range.start(), day(2025, 3, 1));
        assert_eq!(later.range.end(), day(2025, 12, 31));
        assert!(later.range_defaulted);

        let earlier = ScheduleItem::from_row(1, &row("Pilot", "", "2022-05"), 2024)
            .expect("defaulted start keeps the range ordered");
        assert_eq!(earlier.range.start(), day(2022, 1, 1));
        assert_eq!(earlier.range.end(), day(2022, 5, 31));
    }

    #[test]
    fn reversed_rows_are_excluded_not_dropped_silently() {
        let rows = vec![
            row("ok", "2024-01", "2024-02"),
            row("reversed", "2024-06", "2024-03"),
            row("also ok", "2024-03-05", "2024-03-09"),
        ];
        let (items, excluded) = items_from_rows(&rows, 2024);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].id, 1);
        assert_eq!(excluded[0].name, "reversed");
        assert!(excluded[0].reason.contains("invalid range"));
    }

    #[test]
    fn status_labels() {
        assert_eq!(ItemStatus::from_label(" Done "), ItemStatus::Done);
        assert_eq!(ItemStatus::from_label("완료"), ItemStatus::Done);
        assert_eq!(ItemStatus::from_label("예정"), ItemStatus::Planned);
        assert_eq!(ItemStatus::from_label(""), ItemStatus::Unknown);
        assert_eq!(
            ItemStatus::from_label("On hold"),
            ItemStatus::Other("On hold".to_string())
        );
        assert_eq!(ItemStatus::Other("On hold".to_string()).label(), "On hold");
    }
}

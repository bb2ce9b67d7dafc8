use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::datetime::{add_days, days_between, first_day_of_month, format_date, year_span};
use crate::item::{LayoutError, TimeRange};
use crate::selection::Selection;
use crate::timeline::{ItemGroup, LayoutResult};

/// Inclusive date span a timeline is drawn against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayWindow {
    range: TimeRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarSpan {
    pub left: f64,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthColumn {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedBar {
    pub ids: Vec<usize>,
    pub label: String,
    pub start: String,
    pub end: String,
    pub span: BarSpan,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionedRow {
    pub index: usize,
    pub bars: Vec<PositionedBar>,
}

impl DisplayWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, LayoutError> {
        Ok(Self {
            range: TimeRange::new(start, end)?,
        })
    }

    pub fn for_year(year: i32) -> Result<Self, LayoutError> {
        let (start, end) = year_span(year).ok_or(LayoutError::ReferenceYear(year))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.range.start()
    }

    pub fn end(&self) -> NaiveDate {
        self.range.end()
    }

    pub fn total_days(&self) -> i64 {
        days_between(self.start(), self.end()) + 1
    }

    /// Left edge of `date` as a percentage of the window, clamped to `[0, 100]`.
    pub fn position(&self, date: NaiveDate) -> f64 {
        let offset = days_between(self.start(), date) as f64;
        (offset / self.total_days() as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Bar covering `range` through the end of its last day, clipped to the window.
    pub fn bar(&self, range: &TimeRange) -> BarSpan {
        let left = self.position(range.start());
        let right = self.position(add_days(range.end(), 1));
        BarSpan {
            left,
            width: (right - left).max(0.0),
        }
    }

    pub fn month_columns(&self) -> Vec<MonthColumn> {
        let mut columns = Vec::new();
        let mut cursor = first_day_of_month(self.start().year(), self.start().month());

        while let Some(month_start) = cursor {
            if month_start > self.end() {
                break;
            }
            let anchor = month_start.max(self.start());
            columns.push(MonthColumn {
                year: month_start.year(),
                month: month_start.month(),
                label: month_start.format("%b").to_string(),
                left: self.position(anchor),
            });
            cursor = month_start.checked_add_months(chrono::Months::new(1));
        }

        columns
    }

    pub fn today_marker(&self, today: NaiveDate) -> Option<f64> {
        self.range.contains(today).then(|| self.position(today))
    }

    fn place_group(&self, group: &ItemGroup, selection: &Selection) -> PositionedBar {
        PositionedBar {
            ids: group.ids().collect(),
            label: group.label(),
            start: format_date(group.range.start()),
            end: format_date(group.range.end()),
            span: self.bar(&group.range),
            highlighted: group.ids().any(|id| selection.is_highlighted(id)),
        }
    }

    /// Annotates every placed group with its bar span in this window.
    #[tracing::instrument(skip_all, fields(rows = layout.rows.len()))]
    pub fn place(&self, layout: &LayoutResult, selection: &Selection) -> Vec<PositionedRow> {
        layout
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| PositionedRow {
                index,
                bars: row
                    .groups
                    .iter()
                    .map(|group| self.place_group(group, selection))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::DisplayWindow;
    use crate::item::{ScheduleItem, TimeRange};
    use crate::selection::Selection;
    use crate::timeline::{OverlapCheck, layout};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn positions_are_fractions_of_the_year() {
        let window = DisplayWindow::for_year(2023).expect("window");
        assert_eq!(window.total_days(), 365);
        assert!(close(window.position(day(2023, 1, 1)), 0.0));
        assert!(close(window.position(day(2023, 7, 2)), 182.0 / 365.0 * 100.0));
        assert!(close(window.position(day(2022, 12, 1)), 0.0));
        assert!(close(window.position(day(2024, 2, 1)), 100.0));
    }

    #[test]
    fn bars_cover_their_last_day() {
        let window = DisplayWindow::for_year(2024).expect("window");
        let whole = TimeRange::new(day(2024, 1, 1), day(2024, 12, 31)).expect("range");
        let span = window.bar(&whole);
        assert!(close(span.left, 0.0));
        assert!(close(span.width, 100.0));

        let one_day = TimeRange::new(day(2024, 3, 1), day(2024, 3, 1)).expect("range");
        assert!(close(window.bar(&one_day).width, 100.0 / 366.0));

        let clipped = TimeRange::new(day(2023, 11, 1), day(2024, 1, 31)).expect("range");
        let span = window.bar(&clipped);
        assert!(close(span.left, 0.0));
        assert!(close(span.width, 31.0 / 366.0 * 100.0));

        let outside = TimeRange::new(day(2025, 2, 1), day(2025, 3, 1)).expect("range");
        assert!(close(window.bar(&outside).width, 0.0));
    }

    #[test]
    fn month_columns_follow_the_calendar() {
        let window = DisplayWindow::for_year(2024).expect("window");
        let columns = window.month_columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[0].label, "Jan");
        assert!(close(columns[0].left, 0.0));
        assert_eq!(columns[2].month, 3);
        assert!(close(columns[2].left, 60.0 / 366.0 * 100.0));

        let partial = DisplayWindow::new(day(2024, 11, 15), day(2025, 2, 10)).expect("window");
        let labels: Vec<_> = partial
            .month_columns()
            .into_iter()
            .map(|c| (c.year, c.month))
            .collect();
        assert_eq!(labels, vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]);
        assert!(close(partial.month_columns()[0].left, 0.0));
    }

    #[test]
    fn today_marker_only_inside_window() {
        let window = DisplayWindow::for_year(2024).expect("window");
        assert!(window.today_marker(day(2025, 1, 1)).is_none());
        assert!(close(
            window.today_marker(day(2024, 1, 2)).expect("inside"),
            100.0 / 366.0
        ));
    }

    #[test]
    fn placement_marks_the_selected_item() {
        let window = DisplayWindow::for_year(2024).expect("window");
        let items = vec![
            ScheduleItem::new(0, "A", TimeRange::new(day(2024, 1, 1), day(2024, 2, 29)).expect("r")),
            ScheduleItem::new(1, "B", TimeRange::new(day(2024, 2, 1), day(2024, 4, 30)).expect("r")),
            ScheduleItem::new(2, "C", TimeRange::new(day(2024, 2, 1), day(2024, 4, 30)).expect("r")),
        ];
        let result = layout(items, OverlapCheck::FullRow);
        let mut selection = Selection::new(3);
        selection.select(2);

        let rows = window.place(&result, &selection);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].bars[0].label, "A");
        assert!(!rows[0].bars[0].highlighted);
        assert_eq!(rows[1].bars[0].ids, vec![1, 2]);
        assert_eq!(rows[1].bars[0].label, "B / C");
        assert_eq!(rows[1].bars[0].start, "2024-02-01");
        assert!(rows[1].bars[0].highlighted);
    }

    #[test]
    fn reversed_window_is_rejected() {
        assert!(DisplayWindow::new(day(2024, 2, 1), day(2024, 1, 1)).is_err());
    }
}

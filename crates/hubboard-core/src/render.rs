use std::io::{self, IsTerminal, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Settings;
use crate::datetime::format_date;
use crate::item::{ExcludedItem, ItemStatus};
use crate::progress::ProgressState;
use crate::window::{DisplayWindow, PositionedRow};

const TIMELINE_COLUMNS: usize = 48;

#[derive(Debug, Clone)]
pub struct StatusLine {
    pub id: usize,
    pub name: String,
    pub start: String,
    pub end: String,
    pub status: ItemStatus,
    pub progress: ProgressState,
    pub highlighted: bool,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            color: settings.color,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_timeline(
        &mut self,
        rows: &[PositionedRow],
        window: &DisplayWindow,
        today: NaiveDate,
        hidden: &[usize],
        excluded: &[ExcludedItem],
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let highlight = self.paint_fn("33");
        write_timeline(&mut out, rows, window, today, TIMELINE_COLUMNS, &highlight)?;

        if !hidden.is_empty() {
            let ids = hidden.iter().map(|id| id.to_string()).collect::<Vec<_>>();
            writeln!(out, "{}", self.paint(&format!("hidden: {}", ids.join(", ")), "2"))?;
        }
        for item in excluded {
            writeln!(
                out,
                "{}",
                self.paint(&format!("excluded {} {}: {}", item.id, item.name, item.reason), "31")
            )?;
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(lines = lines.len()))]
    pub fn print_status_table(
        &mut self,
        lines: &[StatusLine],
        page: Option<(usize, usize)>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Status".to_string(),
            "Progress".to_string(),
        ];

        write_table(&mut out, headers, self.status_cells(lines))?;
        if let Some((current, count)) = page {
            writeln!(out, "{}", self.paint(&format!("page {current}/{count}"), "2"))?;
        }
        Ok(())
    }

    fn status_cells(&self, lines: &[StatusLine]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| {
                let id = if line.highlighted {
                    self.paint(&format!("*{}", line.id), "33")
                } else {
                    line.id.to_string()
                };
                let status = match line.status {
                    ItemStatus::Done => self.paint(line.status.label(), "32"),
                    ItemStatus::InProgress => self.paint(line.status.label(), "36"),
                    _ => line.status.label().to_string(),
                };
                let progress = match line.progress {
                    ProgressState::Completed => self.paint(&line.progress.label(), "32"),
                    ProgressState::Undetermined => self.paint(&line.progress.label(), "2"),
                    _ => line.progress.label(),
                };
                vec![
                    id,
                    line.name.clone(),
                    line.start.clone(),
                    line.end.clone(),
                    status,
                    progress,
                ]
            })
            .collect()
    }

    pub fn print_overview(
        &mut self,
        start: NaiveDate,
        end: NaiveDate,
        percent: f64,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "program   {} .. {}", format_date(start), format_date(end))?;
        writeln!(
            out,
            "progress  {} {}",
            progress_bar(percent, TIMELINE_COLUMNS),
            self.paint(&format!("{percent:.1}%"), "36")
        )?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }

    fn paint_fn<'a>(&'a self, code: &'a str) -> impl Fn(&str) -> String + 'a {
        move |text| self.paint(text, code)
    }
}

fn column(percent: f64, columns: usize) -> usize {
    ((percent / 100.0) * columns as f64).round().max(0.0) as usize
}

pub fn progress_bar(percent: f64, columns: usize) -> String {
    let filled = column(percent.clamp(0.0, 100.0), columns).min(columns);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(columns - filled))
}

/// Draws each row as a strip of `columns` cells with a month ruler on top and
/// `|` marking today.
pub fn write_timeline<W: Write>(
    mut writer: W,
    rows: &[PositionedRow],
    window: &DisplayWindow,
    today: NaiveDate,
    columns: usize,
    highlight: &dyn Fn(&str) -> String,
) -> anyhow::Result<()> {
    let mut ruler = vec![' '; columns];
    for month in window.month_columns() {
        let idx = column(month.left, columns).min(columns.saturating_sub(1));
        if let Some(initial) = month.label.chars().next() {
            ruler[idx] = initial;
        }
    }
    writeln!(writer, "        {}", ruler.into_iter().collect::<String>())?;

    let marker = window
        .today_marker(today)
        .map(|pos| column(pos, columns).min(columns.saturating_sub(1)));

    if rows.is_empty() {
        writeln!(writer, "(no timeline items)")?;
        return Ok(());
    }

    for row in rows {
        let mut cells = vec!['.'; columns];
        if let Some(idx) = marker {
            cells[idx] = '|';
        }
        for bar in &row.bars {
            if bar.span.width <= 0.0 {
                continue;
            }
            let from = column(bar.span.left, columns).min(columns.saturating_sub(1));
            let to = column(bar.span.left + bar.span.width, columns);
            let fill = if bar.highlighted { '@' } else { '#' };
            for cell in cells.iter_mut().take(to.max(from + 1).min(columns)).skip(from) {
                *cell = fill;
            }
        }

        let labels = row
            .bars
            .iter()
            .map(|bar| {
                let text = format!("{} ({}..{})", bar.label, bar.start, bar.end);
                if bar.highlighted { highlight(&text) } else { text }
            })
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(
            writer,
            "row {:<3} {}  {}",
            row.index + 1,
            cells.into_iter().collect::<String>(),
            labels
        )?;
    }

    Ok(())
}

pub fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        let padding = widths[idx].saturating_sub(UnicodeWidthStr::width(header.as_str()));
        write!(writer, "{}{} ", header, " ".repeat(padding))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Renderer, StatusLine, progress_bar, strip_ansi, write_table, write_timeline};
    use crate::item::{ItemStatus, ScheduleItem, TimeRange};
    use crate::progress::ProgressState;
    use crate::selection::Selection;
    use crate::timeline::{OverlapCheck, layout};
    use crate::window::DisplayWindow;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn table_pads_wide_characters_by_display_width() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["Name".to_string(), "Progress".to_string()],
            vec![
                vec!["설문조사".to_string(), "50%".to_string()],
                vec!["Logo".to_string(), "\x1b[32m100%\x1b[0m".to_string()],
            ],
        )
        .expect("write table");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name     Progress ");
        assert_eq!(lines[1], "-------- -------- ");
        assert_eq!(lines[2], "설문조사 50%      ");
        assert_eq!(strip_ansi(lines[3]), "Logo     100%     ");
    }

    #[test]
    fn timeline_rows_draw_bars_and_today() {
        let window = DisplayWindow::for_year(2023).expect("window");
        let items = vec![
            ScheduleItem::new(0, "A", TimeRange::new(day(2023, 1, 1), day(2023, 6, 30)).expect("r")),
            ScheduleItem::new(1, "B", TimeRange::new(day(2023, 3, 1), day(2023, 12, 31)).expect("r")),
        ];
        let result = layout(items, OverlapCheck::FullRow);
        let mut selection = Selection::new(2);
        selection.select(1);
        let rows = window.place(&result, &selection);

        let mut out = Vec::new();
        write_timeline(&mut out, &rows, &window, day(2023, 12, 31), 12, &|s: &str| s.to_string())
            .expect("write timeline");
        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "        JFMAMJJASOND");
        assert_eq!(lines[1], "row 1   ######.....|  A (2023-01-01..2023-06-30)");
        assert_eq!(lines[2], "row 2   ..@@@@@@@@@@  B (2023-03-01..2023-12-31)");
    }

    #[test]
    fn bars_starting_in_the_last_column_are_drawn() {
        let window = DisplayWindow::for_year(2024).expect("window");
        let items = vec![ScheduleItem::new(
            0,
            "Board report",
            TimeRange::new(day(2024, 12, 31), day(2024, 12, 31)).expect("r"),
        )];
        let result = layout(items, OverlapCheck::FullRow);
        let rows = window.place(&result, &Selection::new(0));

        let mut out = Vec::new();
        write_timeline(&mut out, &rows, &window, day(2025, 1, 5), 48, &|s: &str| s.to_string())
            .expect("write timeline");
        let text = String::from_utf8(out).expect("utf8");
        let expected = format!(
            "row 1   {}#  Board report (2024-12-31..2024-12-31)",
            ".".repeat(47)
        );
        assert_eq!(text.lines().nth(1), Some(expected.as_str()));
    }

    #[test]
    fn status_cells_show_normalized_labels() {
        let renderer = Renderer { color: false };
        let line = |id: usize, status: &str| StatusLine {
            id,
            name: format!("item {id}"),
            start: "2024-01".to_string(),
            end: "2024-03".to_string(),
            status: ItemStatus::from_label(status),
            progress: ProgressState::InProgress(40),
            highlighted: id == 1,
        };
        let cells = renderer.status_cells(&[line(0, "진행중"), line(1, "완료"), line(2, "On hold")]);
        assert_eq!(cells[0][4], "in progress");
        assert_eq!(cells[1][0], "*1");
        assert_eq!(cells[1][4], "done");
        assert_eq!(cells[2][4], "On hold");
        assert_eq!(cells[2][5], "40%");
    }

    #[test]
    fn empty_timeline_says_so() {
        let window = DisplayWindow::for_year(2024).expect("window");
        let mut out = Vec::new();
        write_timeline(&mut out, &[], &window, day(2024, 1, 1), 12, &|s: &str| s.to_string())
            .expect("write timeline");
        assert!(String::from_utf8(out).expect("utf8").contains("(no timeline items)"));
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        assert_eq!(progress_bar(50.0, 10), "[#####.....]");
        assert_eq!(progress_bar(7.1, 10), "[#.........]");
        assert_eq!(progress_bar(0.0, 4), "[....]");
        assert_eq!(progress_bar(120.0, 4), "[####]");
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, Utc};
use clap::error::ErrorKind;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::cli::{CommandArgs, Invocation};
use crate::config::{Config, Settings};
use crate::datetime::{calendar_day, format_date, parse_date, parse_day_arg};
use crate::item::{ExcludedItem, ItemStatus};
use crate::policy::cap_rows;
use crate::progress::{ProgressState, progress_state, span_progress};
use crate::render::{Renderer, StatusLine};
use crate::selection::Selection;
use crate::sheet::{SheetRow, load_sheet};
use crate::timeline::layout_rows;
use crate::window::{DisplayWindow, MonthColumn, PositionedRow};

/// Rows per status page; the dashboard carousel shows two at a time.
const STATUS_PAGE_SIZE: usize = 2;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "parse", "progress", "layout", "status", "overview", "config", "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(cfg, settings, renderer, inv))]
pub fn dispatch(
    cfg: &Config,
    settings: &Settings,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let command = inv.command.as_str();
    let args = match CommandArgs::from_tokens(command, &inv.command_args) {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(());
        }
        Err(err) => return Err(err).with_context(|| format!("invalid arguments for {command}")),
    };

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "parse" => cmd_parse(&args),
        "progress" => cmd_progress(settings, &args),
        "layout" => cmd_layout(settings, renderer, &args),
        "status" => cmd_status(settings, renderer, &args),
        "overview" => cmd_overview(settings, renderer, &args),
        "config" => cmd_config(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

/// `--today` if given, otherwise the current day in the dashboard timezone.
fn resolve_today(settings: &Settings, args: &CommandArgs) -> anyhow::Result<NaiveDate> {
    match args.today.as_deref() {
        Some(raw) => parse_day_arg(raw).context("invalid --today"),
        None => Ok(calendar_day(Utc::now(), &settings.timezone)),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}

#[instrument(skip(args))]
fn cmd_parse(args: &CommandArgs) -> anyhow::Result<()> {
    let raw = args.positional(0, "date")?;
    let date = parse_date(raw, args.end)
        .ok_or_else(|| anyhow!("unrecognized sheet date: {raw}"))
        .context("supported formats: YYYY-MM, YYYY-MM-DD")?;
    println!("{}", format_date(date));
    Ok(())
}

#[derive(Debug, Serialize)]
struct ProgressReport<'a> {
    start: &'a str,
    end: &'a str,
    today: String,
    percent: Option<u8>,
    progress: ProgressState,
}

#[instrument(skip(settings, args))]
fn cmd_progress(settings: &Settings, args: &CommandArgs) -> anyhow::Result<()> {
    let start = args.positional(0, "start date")?;
    let end = args.positional(1, "end date")?;
    let today = resolve_today(settings, args)?;

    let state = progress_state(start, end, today);
    if state == ProgressState::Undetermined {
        warn!(start, end, "progress could not be determined");
    }

    if args.json {
        return print_json(&ProgressReport {
            start,
            end,
            today: format_date(today),
            percent: state.percent(),
            progress: state,
        });
    }

    println!("{}", state.label());
    Ok(())
}

#[derive(Debug, Serialize)]
struct TimelineReport {
    today: String,
    window: DisplayWindow,
    months: Vec<MonthColumn>,
    today_marker: Option<f64>,
    rows: Vec<PositionedRow>,
    hidden: Vec<usize>,
    excluded: Vec<ExcludedItem>,
}

fn load_rows(args: &CommandArgs) -> anyhow::Result<Vec<SheetRow>> {
    let path = args.positional(0, "sheet payload path (or - for stdin)")?;
    load_sheet(Path::new(path))
}

fn selection_for(len: usize, args: &CommandArgs) -> Selection {
    let mut selection = Selection::new(len);
    if let Some(id) = args.select {
        selection.select(id);
    }
    selection
}

#[instrument(skip(settings, renderer, args))]
fn cmd_layout(
    settings: &Settings,
    renderer: &mut Renderer,
    args: &CommandArgs,
) -> anyhow::Result<()> {
    info!("command layout");

    let rows = load_rows(args)?;
    let today = resolve_today(settings, args)?;
    let year = settings.reference_year_for(today);

    let result = layout_rows(&rows, year, settings.overlap);
    let excluded = result.excluded.clone();
    let capped = cap_rows(result, settings.max_rows, settings.overflow);

    let window = DisplayWindow::for_year(year)?;
    let selection = selection_for(rows.len(), args);
    let placed = window.place(&capped.layout, &selection);

    info!(
        items = rows.len(),
        rows = placed.len(),
        hidden = capped.hidden.len(),
        excluded = excluded.len(),
        "timeline ready"
    );

    if args.json {
        return print_json(&TimelineReport {
            today: format_date(today),
            window,
            months: window.month_columns(),
            today_marker: window.today_marker(today),
            rows: placed,
            hidden: capped.hidden,
            excluded,
        });
    }

    renderer.print_timeline(&placed, &window, today, &capped.hidden, &excluded)
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    id: usize,
    name: &'a str,
    description: &'a str,
    start: &'a str,
    end: &'a str,
    status: ItemStatus,
    percent: Option<u8>,
    progress: ProgressState,
    highlighted: bool,
}

#[instrument(skip(settings, renderer, args))]
fn cmd_status(
    settings: &Settings,
    renderer: &mut Renderer,
    args: &CommandArgs,
) -> anyhow::Result<()> {
    info!("command status");

    let rows = load_rows(args)?;
    let today = resolve_today(settings, args)?;
    let mut selection = selection_for(rows.len(), args);
    if let Some(page) = args.page {
        selection.select((page - 1).saturating_mul(STATUS_PAGE_SIZE));
        debug!(page, index = selection.index(), "paging status table");
    }

    let lines: Vec<StatusLine> = rows
        .iter()
        .enumerate()
        .map(|(id, row)| StatusLine {
            id,
            name: row.name.clone(),
            start: row.start.clone(),
            end: row.end.clone(),
            status: ItemStatus::from_label(&row.status),
            progress: progress_state(&row.start, &row.end, today),
            highlighted: selection.is_highlighted(id),
        })
        .collect();

    let (lines, page) = match args.page {
        Some(_) => (
            selection.page(&lines, STATUS_PAGE_SIZE),
            Some((
                selection.current_page(STATUS_PAGE_SIZE) + 1,
                selection.page_count(STATUS_PAGE_SIZE),
            )),
        ),
        None => (lines.as_slice(), None),
    };

    if args.json {
        let report: Vec<StatusReport<'_>> = lines
            .iter()
            .map(|line| {
                let row = &rows[line.id];
                StatusReport {
                    id: line.id,
                    name: &row.name,
                    description: &row.description,
                    start: &row.start,
                    end: &row.end,
                    status: line.status.clone(),
                    percent: line.progress.percent(),
                    progress: line.progress,
                    highlighted: line.highlighted,
                }
            })
            .collect();
        return print_json(&report);
    }

    renderer.print_status_table(lines, page)
}

#[derive(Debug, Serialize)]
struct OverviewReport {
    start: String,
    end: String,
    today: String,
    percent: f64,
}

#[instrument(skip(settings, renderer, args))]
fn cmd_overview(
    settings: &Settings,
    renderer: &mut Renderer,
    args: &CommandArgs,
) -> anyhow::Result<()> {
    let today = resolve_today(settings, args)?;
    let percent = span_progress(settings.program_start, settings.program_end, today);

    if args.json {
        return print_json(&OverviewReport {
            start: format_date(settings.program_start),
            end: format_date(settings.program_end),
            today: format_date(today),
            percent,
        });
    }

    renderer.print_overview(settings.program_start, settings.program_end, percent)
}

#[instrument(skip(cfg))]
fn cmd_config(cfg: &Config) -> anyhow::Result<()> {
    for file in &cfg.loaded_files {
        println!("# {}", file.display());
    }
    let sorted: BTreeMap<_, _> = cfg.iter().collect();
    for (key, value) in sorted {
        println!("{key} = {value}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "\
usage: hubboard [-v|-q] [--config FILE] [--rc KEY=VALUE]... <command> [args]

commands:
  parse <date> [--end]                 resolve a YYYY-MM or YYYY-MM-DD sheet date
  progress <start> <end> [--today D]   completion of a date range
  layout <rows.json|-> [--select ID]   place sheet rows on timeline rows
  status <rows.json|-> [--select ID] [--page N]
                                       per-row progress table, optionally paged
  overview [--today D]                 overall program progress
  config                               show effective configuration

progress, layout, status and overview accept --json and --today YYYY-MM-DD;
run `hubboard <command> -h` for a command's flags"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{expand_command_abbrev, known_command_names};

    #[test]
    fn abbreviations_resolve_only_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("lay", &known), Some("layout"));
        assert_eq!(expand_command_abbrev("st", &known), Some("status"));
        assert_eq!(expand_command_abbrev("pr", &known), Some("progress"));
        assert_eq!(expand_command_abbrev("pa", &known), Some("parse"));
        assert_eq!(expand_command_abbrev("p", &known), None);
        assert_eq!(expand_command_abbrev("zzz", &known), None);
    }
}

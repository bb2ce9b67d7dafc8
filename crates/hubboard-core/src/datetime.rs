use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

pub const DEFAULT_DASHBOARD_TIMEZONE:
  &str = "UTC";

const SHEET_DATE_FORMAT: &str =
  "%Y-%m-%d";

fn sheet_date_regex()
-> Option<&'static Regex> {
  static SHEET_DATE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  SHEET_DATE
    .get_or_init(|| {
      match Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})(?:-(?P<day>\d{2}))?$"
      ) {
        | Ok(re) => Some(re),
        | Err(err) => {
          tracing::error!(
            error = %err,
            "internal sheet date regex failed to compile"
          );
          None
        }
      }
    })
    .as_ref()
}

/// Resolves a sheet date cell to a calendar day.
///
/// `YYYY-MM` resolves to the first day of the month, or to the last day
/// when `end_of_period` is set. `YYYY-MM-DD` resolves to that day either
/// way. Anything else yields `None`.
#[tracing::instrument(level = "trace")]
pub fn parse_date(
  input: &str,
  end_of_period: bool
) -> Option<NaiveDate> {
  let token = input.trim();
  if token.is_empty() {
    return None;
  }

  let caps =
    sheet_date_regex()?.captures(token)?;
  let year: i32 = caps
    .name("year")?
    .as_str()
    .parse()
    .ok()?;
  let month: u32 = caps
    .name("month")?
    .as_str()
    .parse()
    .ok()?;

  let resolved = match caps.name("day")
  {
    | Some(day) => {
      let day: u32 =
        day.as_str().parse().ok()?;
      NaiveDate::from_ymd_opt(
        year, month, day
      )
    }
    | None if end_of_period => {
      last_day_of_month(year, month)
    }
    | None => {
      first_day_of_month(year, month)
    }
  };

  if resolved.is_none() {
    tracing::debug!(
      input = token,
      "sheet date matched the pattern but is not a calendar day"
    );
  }
  resolved
}

/// Like [`parse_date`] for a full `YYYY-MM-DD` day, but reports why the
/// input was rejected.
pub fn parse_day_arg(
  input: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(
    input.trim(),
    SHEET_DATE_FORMAT
  )
  .map_err(|err| {
    anyhow!(
      "invalid day '{input}': {err} \
       (expected YYYY-MM-DD)"
    )
  })
}

/// Whole-day difference `b - a`.
#[must_use]
pub fn days_between(
  a: NaiveDate,
  b: NaiveDate
) -> i64 {
  b.signed_duration_since(a).num_days()
}

#[must_use]
pub fn format_date(
  date: NaiveDate
) -> String {
  date
    .format(SHEET_DATE_FORMAT)
    .to_string()
}

/// Truncates an instant to the calendar day it falls on in `tz`.
#[must_use]
pub fn calendar_day(
  now: DateTime<Utc>,
  tz: &Tz
) -> NaiveDate {
  now.with_timezone(tz).date_naive()
}

#[must_use]
pub fn first_day_of_month(
  year: i32,
  month: u32
) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
}

#[must_use]
pub fn last_day_of_month(
  year: i32,
  month: u32
) -> Option<NaiveDate> {
  if !(1..=12).contains(&month) {
    return None;
  }
  let (next_year, next_month) =
    if month == 12 {
      (year.checked_add(1)?, 1_u32)
    } else {
      (year, month + 1)
    };
  first_day_of_month(
    next_year, next_month
  )?
  .checked_sub_signed(Duration::days(1))
}

#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> Option<u32> {
  last_day_of_month(year, month)
    .map(|date| date.day())
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// The full calendar year used when a sheet row carries no usable dates.
#[must_use]
pub fn year_span(
  year: i32
) -> Option<(NaiveDate, NaiveDate)> {
  Some((
    NaiveDate::from_ymd_opt(year, 1, 1)?,
    NaiveDate::from_ymd_opt(
      year, 12, 31
    )?
  ))
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured dashboard timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use chrono::{
  Datelike,
  NaiveDate
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::{
  DEFAULT_DASHBOARD_TIMEZONE,
  parse_date,
  parse_timezone
};
use crate::policy::Overflow;
use crate::timeline::OverlapCheck;

const CONFIG_ENV_VAR: &str =
  "HUBBOARDRC";
const CONFIG_FILE_NAME: &str =
  ".hubboardrc";

#[derive(Debug, Clone)]
pub struct Config {
  map:              HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Config {
  /// Built-in defaults only; no file is read.
  pub fn defaults() -> Self {
    let mut map = HashMap::new();
    for (key, value) in [
      (
        "timezone",
        DEFAULT_DASHBOARD_TIMEZONE
      ),
      ("timeline.overlap", "full"),
      ("timeline.max_rows", "0"),
      ("timeline.overflow", "truncate"),
      ("program.start", "2023-01"),
      ("program.end", "2036-12"),
      ("color", "on"),
      ("default.command", "overview")
    ] {
      map.insert(
        key.to_string(),
        value.to_string()
      );
    }

    Config {
      map,
      loaded_files: vec![]
    }
  }

  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::defaults();

    let rc = resolve_config_path(
      config_override
    )?;
    if let Some(path) = rc {
      info!(config = %path.display(), "loading dashboard config");
      cfg.load_file(&path)?;
    } else {
      debug!(
        "no dashboard config found; \
         using defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&String, &String)>
  {
    self.map.iter()
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    if self.loaded_files.contains(&path)
    {
      return Err(anyhow!(
        "config include cycle at {}",
        path.display()
      ));
    }
    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once('#')
      {
        line = before.trim();
      }

      if line.is_empty() {
        continue;
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      trace!(key = %key, value = %value, "loaded config key");
      self.map.insert(key, value);
    }

    Ok(())
  }
}

/// Typed view of the keys the dashboard core reads.
#[derive(Debug, Clone)]
pub struct Settings {
  pub timezone:       Tz,
  /// `None` means the current year in `timezone`.
  pub reference_year: Option<i32>,
  pub overlap:        OverlapCheck,
  pub max_rows:       usize,
  pub overflow:       Overflow,
  pub program_start:  NaiveDate,
  pub program_end:    NaiveDate,
  pub color:          bool
}

impl Settings {
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let timezone_raw = cfg
      .get("timezone")
      .unwrap_or_else(|| {
        DEFAULT_DASHBOARD_TIMEZONE
          .to_string()
      });
    let timezone = parse_timezone(
      &timezone_raw,
      "config:timezone"
    )
    .ok_or_else(|| {
      anyhow!(
        "invalid timezone: \
         {timezone_raw}"
      )
    })?;

    let reference_year = cfg
      .get("reference.year")
      .filter(|v| !v.trim().is_empty())
      .map(|v| {
        v.trim().parse::<i32>().with_context(
          || {
            format!(
              "invalid reference.year: \
               {v}"
            )
          }
        )
      })
      .transpose()?;

    let overlap = cfg
      .get("timeline.overlap")
      .map(|v| v.parse::<OverlapCheck>())
      .transpose()?
      .unwrap_or_default();

    let max_rows = cfg
      .get("timeline.max_rows")
      .map(|v| {
        v.trim().parse::<usize>().with_context(
          || {
            format!(
              "invalid timeline.max_rows: \
               {v}"
            )
          }
        )
      })
      .transpose()?
      .unwrap_or(0);

    let overflow = cfg
      .get("timeline.overflow")
      .map(|v| v.parse::<Overflow>())
      .transpose()?
      .unwrap_or_default();

    let program_start =
      config_date(cfg, "program.start", false)?;
    let program_end =
      config_date(cfg, "program.end", true)?;
    if program_start > program_end {
      return Err(anyhow!(
        "program.start {program_start} \
         is after program.end \
         {program_end}"
      ));
    }

    let color = match cfg
      .get("color")
      .unwrap_or_else(|| "on".to_string())
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        true
      }
      | "off" | "no" | "false" | "0" => {
        false
      }
      | other => {
        return Err(anyhow!(
          "invalid color setting: \
           {other}"
        ))
      }
    };

    Ok(Self {
      timezone,
      reference_year,
      overlap,
      max_rows,
      overflow,
      program_start,
      program_end,
      color
    })
  }

  pub fn reference_year_for(
    &self,
    today: NaiveDate
  ) -> i32 {
    self
      .reference_year
      .unwrap_or_else(|| today.year())
  }
}

fn config_date(
  cfg: &Config,
  key: &str,
  end_of_period: bool
) -> anyhow::Result<NaiveDate> {
  let raw = cfg.get(key).ok_or_else(
    || anyhow!("missing config key {key}")
  )?;
  parse_date(&raw, end_of_period)
    .ok_or_else(|| {
      anyhow!(
        "invalid {key}: {raw} \
         (expected YYYY-MM or \
         YYYY-MM-DD)"
      )
    })
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if rc_env == "/dev/null"
      || rc_env.trim().is_empty()
    {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let Some(home) = dirs::home_dir()
  else {
    warn!(
      "cannot determine home \
       directory; skipping user config"
    );
    return Ok(None);
  };
  let candidate =
    home.join(CONFIG_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

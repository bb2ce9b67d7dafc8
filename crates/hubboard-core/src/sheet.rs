use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// One data row of a schedule sheet: `[name, description, start, end, status]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub name: String,
    pub description: String,
    pub start: String,
    pub end: String,
    pub status: String,
}

impl SheetRow {
    pub fn new(name: &str, description: &str, start: &str, end: &str, status: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            status: status.to_string(),
        }
    }

    fn from_cells(cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).map(|c| c.trim().to_string()).unwrap_or_default();
        Self {
            name: cell(0),
            description: cell(1),
            start: cell(2),
            end: cell(3),
            status: cell(4),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parses the sheets endpoint payload: a JSON array of row arrays whose first
/// row is the header. Short rows are padded; rows without a name are skipped.
#[tracing::instrument(skip(text))]
pub fn parse_sheet_json(text: &str) -> anyhow::Result<Vec<SheetRow>> {
    let raw: Value = serde_json::from_str(text).context("sheet payload is not valid JSON")?;
    let Value::Array(raw_rows) = raw else {
        return Err(anyhow!("sheet payload must be a JSON array of rows"));
    };

    let mut rows = Vec::with_capacity(raw_rows.len().saturating_sub(1));
    for (line, raw_row) in raw_rows.iter().enumerate().skip(1) {
        let Value::Array(cells) = raw_row else {
            return Err(anyhow!("sheet row {line} is not an array"));
        };
        let cells: Vec<String> = cells.iter().map(cell_text).collect();
        let row = SheetRow::from_cells(&cells);
        if row.name.is_empty() {
            debug!(line, "skipping sheet row without a name");
            continue;
        }
        rows.push(row);
    }

    debug!(rows = rows.len(), "parsed sheet payload");
    Ok(rows)
}

/// Reads a sheet payload from `path`, or from stdin when `path` is `-`.
#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_sheet(path: &Path) -> anyhow::Result<Vec<SheetRow>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read sheet payload from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    let rows = parse_sheet_json(&text)
        .with_context(|| format!("failed to parse sheet payload {}", path.display()))?;
    info!(rows = rows.len(), "loaded sheet rows");
    Ok(rows)
}

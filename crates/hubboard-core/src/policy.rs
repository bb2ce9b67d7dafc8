use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, warn};

use crate::timeline::LayoutResult;

/// What to do with rows beyond the display limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Overflow {
    #[default]
    Truncate,
    /// Fold overflow groups into the last visible row. Bars in that row may overlap.
    MergeOverflow,
}

impl FromStr for Overflow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" | "drop" => Ok(Self::Truncate),
            "merge" | "merge-overflow" => Ok(Self::MergeOverflow),
            other => Err(anyhow!("invalid overflow policy: {other} (expected truncate or merge)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CappedLayout {
    pub layout: LayoutResult,
    /// Ids no longer visible after truncation.
    pub hidden: Vec<usize>,
}

/// Limits `layout` to `max_rows` rows; `0` leaves it untouched.
#[tracing::instrument(skip(layout), fields(rows = layout.rows.len()))]
pub fn cap_rows(mut layout: LayoutResult, max_rows: usize, overflow: Overflow) -> CappedLayout {
    if max_rows == 0 || layout.rows.len() <= max_rows {
        return CappedLayout {
            layout,
            hidden: Vec::new(),
        };
    }

    let overflow_rows = layout.rows.split_off(max_rows);
    let mut hidden = Vec::new();

    match overflow {
        Overflow::Truncate => {
            hidden.extend(overflow_rows.iter().flat_map(|row| row.items().map(|item| item.id)));
            hidden.sort_unstable();
            warn!(
                dropped_rows = overflow_rows.len(),
                hidden = hidden.len(),
                "timeline rows truncated"
            );
        }
        Overflow::MergeOverflow => {
            if let Some(last) = layout.rows.last_mut() {
                last.groups
                    .extend(overflow_rows.into_iter().flat_map(|row| row.groups));
                last.groups.sort_by_key(|group| {
                    (group.range.start(), group.range.end(), group.first_id())
                });
                debug!(groups = last.groups.len(), "merged overflow rows into last row");
            }
        }
    }

    CappedLayout { layout, hidden }
}

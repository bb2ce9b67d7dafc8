use std::str::FromStr;

use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, trace};

use crate::item::{ExcludedItem, ScheduleItem, TimeRange, items_from_rows};
use crate::sheet::SheetRow;

/// Items sharing an exact range are paired in one bar, never more than this.
pub const MAX_GROUP_MEMBERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapCheck {
    /// A group fits a row only if it overlaps none of the row's entries.
    #[default]
    FullRow,
    /// A group fits a row if the row's last entry ends strictly before it starts.
    LastEntry,
}

impl FromStr for OverlapCheck {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" | "full-row" | "row" => Ok(Self::FullRow),
            "last" | "last-entry" | "entry" => Ok(Self::LastEntry),
            other => Err(anyhow!("invalid overlap check: {other} (expected full or last)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemGroup {
    pub range: TimeRange,
    pub members: Vec<ScheduleItem>,
}

impl ItemGroup {
    fn new(item: ScheduleItem) -> Self {
        Self {
            range: item.range,
            members: vec![item],
        }
    }

    fn accepts(&self, item: &ScheduleItem) -> bool {
        self.members.len() < MAX_GROUP_MEMBERS && self.range == item.range
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|item| item.id)
    }

    pub fn first_id(&self) -> usize {
        self.members.first().map(|item| item.id).unwrap_or_default()
    }

    pub fn label(&self) -> String {
        self.members
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub groups: Vec<ItemGroup>,
}

impl Row {
    fn fits(&self, group: &ItemGroup, check: OverlapCheck) -> bool {
        match check {
            OverlapCheck::FullRow => self
                .groups
                .iter()
                .all(|placed| !placed.range.overlaps(&group.range)),
            OverlapCheck::LastEntry => self
                .groups
                .last()
                .map(|last| last.range.end() < group.range.start())
                .unwrap_or(true),
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &ScheduleItem> {
        self.groups.iter().flat_map(|group| group.members.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayoutResult {
    pub rows: Vec<Row>,
    /// Items left off the timeline because their range was invalid.
    pub excluded: Vec<ExcludedItem>,
}

impl LayoutResult {
    pub fn item_count(&self) -> usize {
        self.rows.iter().map(|row| row.items().count()).sum()
    }

    pub fn row_of(&self, id: usize) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.items().any(|item| item.id == id))
    }
}

/// Sorts by `(start, end, id)` and pairs consecutive items with equal ranges.
pub fn group_items(mut items: Vec<ScheduleItem>) -> Vec<ItemGroup> {
    items.sort_by_key(|item| (item.range.start(), item.range.end(), item.id));

    let mut groups: Vec<ItemGroup> = Vec::with_capacity(items.len());
    for item in items {
        match groups.last_mut() {
            Some(group) if group.accepts(&item) => group.members.push(item),
            _ => groups.push(ItemGroup::new(item)),
        }
    }
    groups
}

/// Assigns items to the fewest rows the first-fit pass finds.
#[tracing::instrument(skip(items), fields(items = items.len()))]
pub fn layout(items: Vec<ScheduleItem>, check: OverlapCheck) -> LayoutResult {
    let groups = group_items(items);
    let mut rows: Vec<Row> = Vec::new();

    for group in groups {
        match rows.iter_mut().position(|row| row.fits(&group, check)) {
            Some(idx) => {
                trace!(row = idx, range = %group.range, label = %group.label(), "placed group");
                rows[idx].groups.push(group);
            }
            None => {
                trace!(row = rows.len(), range = %group.range, label = %group.label(), "opened row");
                rows.push(Row { groups: vec![group] });
            }
        }
    }

    debug!(rows = rows.len(), "timeline layout complete");
    LayoutResult {
        rows,
        excluded: Vec::new(),
    }
}

/// Builds items from sheet rows and lays them out, reporting invalid rows.
#[tracing::instrument(skip(rows), fields(rows = rows.len()))]
pub fn layout_rows(rows: &[SheetRow], reference_year: i32, check: OverlapCheck) -> LayoutResult {
    let (items, excluded) = items_from_rows(rows, reference_year);
    let mut result = layout(items, check);
    result.excluded = excluded;
    result
}

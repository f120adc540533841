//! Grouped change detection between a current and a previous snapshot
//!
//! Rows are grouped by `(Material No, Material Description)`. Inside a group,
//! delivery dates present on one side only produce new or deleted rows; for
//! dates present on both sides every current row is compared against every
//! previous row at that date and each differing quantity yields one changed
//! row.

use crate::dataset::{CellValue, ColumnNames, Dataset, RecordLayout, Side};
use crate::error::{MatdiffError, Result};
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// Composite business key borrowed from a dataset row
type GroupKey<'a> = (&'a CellValue, &'a CellValue);

/// Row indices of each group, in ascending key order
type Groups<'a> = BTreeMap<GroupKey<'a>, Vec<usize>>;

/// Where an output row came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceRow {
    pub side: Side,
    /// Zero-based data row index in the loaded dataset
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub source: SourceRow,
    pub values: Vec<CellValue>,
}

/// One classified output table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell of `row` under the column named `column`
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values.get(col))
    }

    fn push_from(&mut self, dataset: &Dataset, side: Side, index: usize) {
        if let Some(values) = dataset.row(index) {
            self.rows.push(ResultRow {
                source: SourceRow { side, index },
                values: values.to_vec(),
            });
        }
    }
}

/// Counts describing one comparison run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonStats {
    pub current_rows: usize,
    pub previous_rows: usize,
    pub current_groups: usize,
    pub previous_groups: usize,
    pub common_groups: usize,
}

/// New, deleted and changed rows of one comparison run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub new_entries: ResultTable,
    pub deleted_entries: ResultTable,
    pub changed_entries: ResultTable,
    pub stats: ComparisonStats,
}

impl ComparisonResult {
    /// Check if there are any classified rows
    pub fn has_changes(&self) -> bool {
        !self.new_entries.is_empty()
            || !self.deleted_entries.is_empty()
            || !self.changed_entries.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.new_entries.len() + self.deleted_entries.len() + self.changed_entries.len()
    }
}

/// Per-group outcome, as row indices into the two datasets
#[derive(Debug, Default)]
struct GroupDiff {
    new: Vec<usize>,
    deleted: Vec<usize>,
    /// (current row, previous row) pairs at a common date with different quantities
    changed: Vec<(usize, usize)>,
}

/// Change detector for delivery snapshots
pub struct ChangeDetector;

impl ChangeDetector {
    /// Classify the rows of `current` against `previous`
    pub fn detect_changes(
        current: &Dataset,
        previous: &Dataset,
        names: &ColumnNames,
    ) -> Result<ComparisonResult> {
        let current_layout = RecordLayout::resolve(current, names, Side::Current)?;
        let previous_layout = RecordLayout::resolve(previous, names, Side::Previous)?;

        let current_groups = Self::group_rows(current, &current_layout, Side::Current)?;
        let previous_groups = Self::group_rows(previous, &previous_layout, Side::Previous)?;

        // Groups are independent of each other
        let group_diffs: Vec<GroupDiff> = current_groups
            .iter()
            .collect::<Vec<_>>()
            .par_iter()
            .map(|(key, current_rows)| match previous_groups.get(*key) {
                None => GroupDiff {
                    new: current_rows.to_vec(),
                    ..GroupDiff::default()
                },
                Some(previous_rows) => Self::diff_group(
                    current,
                    &current_layout,
                    current_rows,
                    previous,
                    &previous_layout,
                    previous_rows,
                ),
            })
            .collect();

        let mut new_entries = ResultTable::new(current.column_names());
        let mut deleted_entries = ResultTable::new(previous.column_names());
        // An existing previous-quantity column is overwritten, not duplicated
        let previous_quantity_column = current.column_index(&names.previous_quantity);
        let mut changed_columns = current.column_names();
        if previous_quantity_column.is_none() {
            changed_columns.push(names.previous_quantity.clone());
        }
        let mut changed_entries = ResultTable::new(changed_columns);

        for diff in &group_diffs {
            for &index in &diff.new {
                new_entries.push_from(current, Side::Current, index);
            }
            for &index in &diff.deleted {
                deleted_entries.push_from(previous, Side::Previous, index);
            }
            for &(current_index, previous_index) in &diff.changed {
                let previous_quantity = Self::cell(
                    previous,
                    previous_index,
                    previous_layout.quantity,
                    Side::Previous,
                )?
                .clone();
                let mut values = current
                    .row(current_index)
                    .map(<[CellValue]>::to_vec)
                    .unwrap_or_default();
                match previous_quantity_column.filter(|&col| col < values.len()) {
                    Some(col) => values[col] = previous_quantity,
                    None => values.push(previous_quantity),
                }
                changed_entries.rows.push(ResultRow {
                    source: SourceRow {
                        side: Side::Current,
                        index: current_index,
                    },
                    values,
                });
            }
        }

        // Groups that vanished entirely go after the per-date deletions
        let mut common_groups = 0;
        for (key, previous_rows) in &previous_groups {
            if current_groups.contains_key(key) {
                common_groups += 1;
                continue;
            }
            for &index in previous_rows {
                deleted_entries.push_from(previous, Side::Previous, index);
            }
        }

        let stats = ComparisonStats {
            current_rows: current.row_count(),
            previous_rows: previous.row_count(),
            current_groups: current_groups.len(),
            previous_groups: previous_groups.len(),
            common_groups,
        };

        info!(
            "Compared {} current rows against {} previous rows: {} new, {} deleted, {} changed",
            stats.current_rows,
            stats.previous_rows,
            new_entries.len(),
            deleted_entries.len(),
            changed_entries.len()
        );

        Ok(ComparisonResult {
            new_entries,
            deleted_entries,
            changed_entries,
            stats,
        })
    }

    /// Partition row indices by composite key, keeping input order inside a group
    fn group_rows<'a>(
        dataset: &'a Dataset,
        layout: &RecordLayout,
        side: Side,
    ) -> Result<Groups<'a>> {
        let mut groups: Groups<'a> = BTreeMap::new();
        for index in 0..dataset.row_count() {
            let material_no = Self::cell(dataset, index, layout.material_no, side)?;
            let description = Self::cell(dataset, index, layout.material_description, side)?;
            groups
                .entry((material_no, description))
                .or_default()
                .push(index);
        }
        debug!(
            "Grouped {} {side} rows into {} groups",
            dataset.row_count(),
            groups.len()
        );
        Ok(groups)
    }

    /// Diff one group present in both snapshots
    fn diff_group(
        current: &Dataset,
        current_layout: &RecordLayout,
        current_rows: &[usize],
        previous: &Dataset,
        previous_layout: &RecordLayout,
        previous_rows: &[usize],
    ) -> GroupDiff {
        let current_dates = Self::rows_by_date(current, current_layout, current_rows);
        let previous_dates = Self::rows_by_date(previous, previous_layout, previous_rows);

        let new = current_rows
            .iter()
            .copied()
            .filter(|&index| {
                Self::date_of(current, current_layout, index)
                    .is_some_and(|date| !previous_dates.contains_key(date))
            })
            .collect();

        let deleted = previous_rows
            .iter()
            .copied()
            .filter(|&index| {
                Self::date_of(previous, previous_layout, index)
                    .is_some_and(|date| !current_dates.contains_key(date))
            })
            .collect();

        let mut changed = Vec::new();
        for (date, current_at_date) in &current_dates {
            let Some(previous_at_date) = previous_dates.get(date) else {
                continue;
            };
            for &current_index in current_at_date {
                let current_quantity = &current.rows()[current_index][current_layout.quantity];
                for &previous_index in previous_at_date {
                    let previous_quantity =
                        &previous.rows()[previous_index][previous_layout.quantity];
                    if current_quantity != previous_quantity {
                        changed.push((current_index, previous_index));
                    }
                }
            }
        }

        GroupDiff {
            new,
            deleted,
            changed,
        }
    }

    fn date_of<'a>(
        dataset: &'a Dataset,
        layout: &RecordLayout,
        index: usize,
    ) -> Option<&'a CellValue> {
        dataset.row(index).map(|row| &row[layout.delivery_date])
    }

    /// Row indices of a group keyed by delivery date, ascending
    fn rows_by_date<'a>(
        dataset: &'a Dataset,
        layout: &RecordLayout,
        rows: &[usize],
    ) -> BTreeMap<&'a CellValue, Vec<usize>> {
        let mut by_date: BTreeMap<&'a CellValue, Vec<usize>> = BTreeMap::new();
        for &index in rows {
            if let Some(row) = dataset.row(index) {
                by_date
                    .entry(&row[layout.delivery_date])
                    .or_default()
                    .push(index);
            }
        }
        by_date
    }

    fn cell<'a>(
        dataset: &'a Dataset,
        row: usize,
        column: usize,
        side: Side,
    ) -> Result<&'a CellValue> {
        dataset
            .row(row)
            .and_then(|values| values.get(column))
            .ok_or_else(|| {
                MatdiffError::compare(format!(
                    "Row {row} of the {side} dataset has no cell at column {column}"
                ))
            })
    }
}

/// Compare two snapshots using the default column names
pub fn compare(current: &Dataset, previous: &Dataset) -> Result<ComparisonResult> {
    ChangeDetector::detect_changes(current, previous, &ColumnNames::default())
}

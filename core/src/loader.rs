//! Spreadsheet loading via calamine

use crate::dataset::{CellValue, ColumnNames, Dataset};
use crate::error::{MatdiffError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info};
use std::path::Path;

/// Cells of one worksheet, anchored at `start` (zero-based row, column)
#[derive(Debug, Clone)]
pub struct SheetData {
    pub name: String,
    pub start: (u32, u32),
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    /// Absolute zero-based row index of the `offset`-th stored row
    pub fn absolute_row(&self, offset: usize) -> u32 {
        self.start.0 + offset as u32
    }

    pub fn absolute_col(&self, offset: usize) -> u32 {
        self.start.1 + offset as u32
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => dt
                .as_datetime()
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Number(dt.as_f64())),
            Data::DateTimeIso(s) => parse_iso_datetime(s)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(s.clone())),
            other => CellValue::Text(other.to_string()),
        }
    }
}

fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Check if file format is supported
pub fn is_supported_format(file_path: &Path) -> bool {
    if let Some(extension) = file_path.extension().and_then(|s| s.to_str()) {
        matches!(
            extension.to_lowercase().as_str(),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods"
        )
    } else {
        false
    }
}

/// Read every worksheet of a workbook, in workbook order
pub fn read_workbook(path: &Path) -> Result<Vec<SheetData>> {
    if !path.exists() {
        return Err(MatdiffError::load(format!(
            "File not found: {}",
            path.display()
        )));
    }
    if !is_supported_format(path) {
        return Err(MatdiffError::load(format!(
            "Unsupported file type: {} (expected .xlsx, .xlsm, .xlsb, .xls or .ods)",
            path.display()
        )));
    }

    let mut workbook = open_workbook_auto(path).map_err(|e| {
        MatdiffError::load(format!("Error loading file '{}': {e}", path.display()))
    })?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook.worksheet_range(&name).map_err(|e| {
            MatdiffError::load(format!(
                "Error reading sheet '{name}' of '{}': {e}",
                path.display()
            ))
        })?;
        let start = range.start().unwrap_or((0, 0));
        let rows = range
            .rows()
            .map(|row| row.iter().map(CellValue::from).collect())
            .collect();
        sheets.push(SheetData { name, start, rows });
    }

    Ok(sheets)
}

/// Load the first worksheet as a dataset with the header in the first row.
///
/// Blank header cells become `Unnamed: <n>`; fully blank data rows are
/// skipped. No columns are dropped.
pub fn read_dataset(path: &Path) -> Result<Dataset> {
    let sheet = read_workbook(path)?.into_iter().next().ok_or_else(|| {
        MatdiffError::load(format!("Workbook has no worksheets: {}", path.display()))
    })?;

    let mut rows = sheet.rows.into_iter();
    let Some(header) = rows.next() else {
        debug!("Sheet '{}' of {} is empty", sheet.name, path.display());
        return Ok(Dataset::default());
    };

    let leading_blank = sheet.start.1 as usize;
    let columns = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            CellValue::Empty => format!("Unnamed: {}", i + leading_blank),
            other => other.to_string(),
        })
        .collect();

    let data = rows
        .filter(|row: &Vec<CellValue>| !row.iter().all(CellValue::is_empty))
        .collect();

    Ok(Dataset::new(columns, data))
}

/// Load a snapshot and drop the internal tracking column
pub fn load_dataset(path: &Path, names: &ColumnNames) -> Result<Dataset> {
    let mut dataset = read_dataset(path)?;
    if dataset.drop_column(&names.tracking) {
        debug!("Dropped tracking column '{}'", names.tracking);
    } else {
        debug!(
            "Tracking column '{}' not present in {}",
            names.tracking,
            path.display()
        );
    }

    info!(
        "Loaded {} rows x {} columns from {}",
        dataset.row_count(),
        dataset.column_count(),
        path.display()
    );
    Ok(dataset)
}

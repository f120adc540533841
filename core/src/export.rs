//! Comparison report export
//!
//! `render` writes the three result tables to a workbook. `highlight` then
//! re-opens that workbook and re-saves it with a solid fill behind the
//! quantity cells of the changed sheet. The two steps fail independently: a
//! failed highlight leaves the rendered report untouched on disk.

use crate::change_detection::{ComparisonResult, ResultTable};
use crate::dataset::{CellValue, ColumnNames};
use crate::error::{MatdiffError, Result};
use crate::loader::{self, SheetData};
use chrono::NaiveTime;
use log::{debug, info, warn};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const NEW_ENTRIES_SHEET: &str = "New Entries";
pub const DELETED_ENTRIES_SHEET: &str = "Deleted Entries";
pub const CHANGED_ENTRIES_SHEET: &str = "Changed Entries";

/// Solid yellow
pub const HIGHLIGHT_COLOR: u32 = 0xFFFF00;

/// Default report file name
pub const DEFAULT_REPORT_NAME: &str = "Comparison_Result.xlsx";

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Zero-based worksheet cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Column letters for a zero-based column index (0 -> A, 26 -> AA)
    pub fn column_name(col: u16) -> String {
        let mut n = col as u32 + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(char::from(b'A' + rem as u8));
            n = (n - 1) / 26;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_name(self.col), self.row + 1)
    }
}

impl Serialize for CellRef {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
}

/// A report written by `render`
#[derive(Debug, Clone, Serialize)]
pub struct RenderedReport {
    pub path: PathBuf,
    pub sheets: Vec<SheetSummary>,
    /// Cells of the changed sheet that `highlight` is expected to fill
    pub highlight_targets: Vec<CellRef>,
}

/// Cells filled by `highlight`
#[derive(Debug, Clone, Serialize)]
pub struct HighlightSummary {
    pub path: PathBuf,
    pub sheet: String,
    pub cells: Vec<CellRef>,
}

/// Shared cell formats for one workbook
struct CellFormats {
    header: Format,
    date: Format,
    datetime: Format,
    fill: Format,
    fill_date: Format,
    fill_datetime: Format,
}

impl CellFormats {
    fn new() -> Self {
        let fill = Format::new()
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(HIGHLIGHT_COLOR));
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format(DATE_FORMAT),
            datetime: Format::new().set_num_format(DATETIME_FORMAT),
            fill_date: fill.clone().set_num_format(DATE_FORMAT),
            fill_datetime: fill.clone().set_num_format(DATETIME_FORMAT),
            fill,
        }
    }
}

/// Writes comparison results as a three-sheet workbook
pub struct ReportExporter {
    highlight_columns: Vec<String>,
}

impl ReportExporter {
    /// Create an exporter highlighting the quantity columns named in `names`
    pub fn new(names: &ColumnNames) -> Self {
        Self {
            highlight_columns: vec![names.quantity.clone(), names.previous_quantity.clone()],
        }
    }

    /// Write `New Entries`, `Deleted Entries` and `Changed Entries` to `destination`
    pub fn render(&self, result: &ComparisonResult, destination: &Path) -> Result<RenderedReport> {
        let formats = CellFormats::new();
        let mut workbook = Workbook::new();
        let mut sheets = Vec::with_capacity(3);

        for (name, table) in [
            (NEW_ENTRIES_SHEET, &result.new_entries),
            (DELETED_ENTRIES_SHEET, &result.deleted_entries),
            (CHANGED_ENTRIES_SHEET, &result.changed_entries),
        ] {
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(name)
                .map_err(|e| MatdiffError::from_xlsx(e, destination))?;
            write_table(sheet, table, &formats)
                .map_err(|e| MatdiffError::from_xlsx(e, destination))?;
            sheets.push(SheetSummary {
                name: name.to_string(),
                rows: table.len(),
                columns: table.columns.len(),
            });
        }

        workbook
            .save(destination)
            .map_err(|e| MatdiffError::from_xlsx(e, destination))?;

        info!("Results have been written to {}", destination.display());

        Ok(RenderedReport {
            path: destination.to_path_buf(),
            sheets,
            highlight_targets: self.highlight_targets(&result.changed_entries),
        })
    }

    /// Data cells of `table` under the highlighted columns, header excluded
    pub fn highlight_targets(&self, table: &ResultTable) -> Vec<CellRef> {
        let columns = self.columns_to_fill(&table.columns);
        let mut cells = Vec::with_capacity(columns.len() * table.len());
        for row in 0..table.len() {
            for &col in &columns {
                cells.push(CellRef::new(row as u32 + 1, col));
            }
        }
        cells
    }

    /// Re-open `destination` and fill the quantity cells of `Changed Entries`
    pub fn highlight(&self, destination: &Path) -> Result<HighlightSummary> {
        let sheets = loader::read_workbook(destination).map_err(|e| match e {
            MatdiffError::Load(msg) => MatdiffError::write(format!(
                "Failed to re-open report for highlighting: {msg}"
            )),
            other => other,
        })?;

        let changed = sheets
            .iter()
            .find(|s| s.name == CHANGED_ENTRIES_SHEET)
            .ok_or_else(|| {
                MatdiffError::write(format!(
                    "Sheet '{CHANGED_ENTRIES_SHEET}' not found in {}",
                    destination.display()
                ))
            })?;
        let targets = self.fill_targets(changed);
        if targets.is_empty() {
            debug!("No quantity cells to highlight in {}", destination.display());
        }

        let formats = CellFormats::new();
        let mut workbook = Workbook::new();
        for sheet_data in &sheets {
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(&sheet_data.name)
                .map_err(|e| MatdiffError::from_xlsx(e, destination))?;
            let fill_cells: &[CellRef] = if sheet_data.name == CHANGED_ENTRIES_SHEET {
                &targets
            } else {
                &[]
            };
            rewrite_sheet(sheet, sheet_data, fill_cells, &formats)
                .map_err(|e| MatdiffError::from_xlsx(e, destination))?;
        }

        workbook.save(destination).map_err(|e| {
            warn!("Report {} left without highlighting", destination.display());
            MatdiffError::from_xlsx(e, destination)
        })?;

        info!(
            "Highlighted {} cells in '{CHANGED_ENTRIES_SHEET}'",
            targets.len()
        );

        Ok(HighlightSummary {
            path: destination.to_path_buf(),
            sheet: CHANGED_ENTRIES_SHEET.to_string(),
            cells: targets,
        })
    }

    fn columns_to_fill(&self, headers: &[String]) -> Vec<u16> {
        headers
            .iter()
            .enumerate()
            .filter(|(_, name)| self.highlight_columns.iter().any(|h| h == *name))
            .map(|(col, _)| col as u16)
            .collect()
    }

    /// Cells to fill in a sheet read back from disk; the header is absolute row 0
    fn fill_targets(&self, sheet: &SheetData) -> Vec<CellRef> {
        if sheet.start.0 != 0 {
            return Vec::new();
        }
        let Some(header) = sheet.rows.first() else {
            return Vec::new();
        };
        let columns: Vec<u16> = header
            .iter()
            .enumerate()
            .filter(|(_, cell)| match cell {
                CellValue::Text(name) => self.highlight_columns.contains(name),
                _ => false,
            })
            .map(|(offset, _)| sheet.absolute_col(offset) as u16)
            .collect();

        let mut cells = Vec::new();
        for offset in 1..sheet.rows.len() {
            for &col in &columns {
                cells.push(CellRef::new(sheet.absolute_row(offset), col));
            }
        }
        cells
    }
}

fn write_table(
    sheet: &mut Worksheet,
    table: &ResultTable,
    formats: &CellFormats,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    for (col, name) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &formats.header)?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        for (col, value) in row.values.iter().enumerate() {
            write_cell(sheet, row_idx as u32 + 1, col as u16, value, false, formats)?;
        }
    }
    sheet.autofit();
    Ok(())
}

fn rewrite_sheet(
    sheet: &mut Worksheet,
    data: &SheetData,
    fill_cells: &[CellRef],
    formats: &CellFormats,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    for (row_offset, row) in data.rows.iter().enumerate() {
        let row_num = data.absolute_row(row_offset);
        for (col_offset, value) in row.iter().enumerate() {
            let col = data.absolute_col(col_offset) as u16;
            if row_num == 0 {
                if let CellValue::Text(name) = value {
                    sheet.write_string_with_format(row_num, col, name, &formats.header)?;
                    continue;
                }
            }
            let filled = fill_cells.contains(&CellRef::new(row_num, col));
            write_cell(sheet, row_num, col, value, filled, formats)?;
        }
    }
    sheet.autofit();
    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    filled: bool,
    formats: &CellFormats,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    let fill = filled.then_some(&formats.fill);
    match value {
        CellValue::Empty => {
            if let Some(format) = fill {
                sheet.write_blank(row, col, format)?;
            }
        }
        CellValue::Bool(b) => {
            match fill {
                Some(format) => sheet.write_boolean_with_format(row, col, *b, format)?,
                None => sheet.write_boolean(row, col, *b)?,
            };
        }
        CellValue::Number(n) => {
            match fill {
                Some(format) => sheet.write_number_with_format(row, col, *n, format)?,
                None => sheet.write_number(row, col, *n)?,
            };
        }
        CellValue::DateTime(dt) => {
            let date_only = dt.time() == NaiveTime::MIN;
            let format = match (date_only, filled) {
                (true, false) => &formats.date,
                (true, true) => &formats.fill_date,
                (false, false) => &formats.datetime,
                (false, true) => &formats.fill_datetime,
            };
            sheet.write_datetime_with_format(row, col, dt, format)?;
        }
        CellValue::Text(s) => {
            match fill {
                Some(format) => sheet.write_string_with_format(row, col, s, format)?,
                None => sheet.write_string(row, col, s)?,
            };
        }
    }
    Ok(())
}

/// Render with the default column names
pub fn render(result: &ComparisonResult, destination: &Path) -> Result<RenderedReport> {
    ReportExporter::new(&ColumnNames::default()).render(result, destination)
}

/// Highlight with the default column names
pub fn highlight(destination: &Path) -> Result<HighlightSummary> {
    ReportExporter::new(&ColumnNames::default()).highlight(destination)
}

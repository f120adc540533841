//! Builders for delivery datasets and input workbooks used in tests

use crate::dataset::{CellValue, Dataset};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Business columns in input order, followed by one pass-through column
const DELIVERY_COLUMNS: [&str; 5] = [
    "Material No",
    "Material Description",
    "Delivery Date",
    "Quantity",
    "Plant",
];

pub fn date(ymd: (i32, u32, u32)) -> CellValue {
    let (y, m, d) = ymd;
    CellValue::DateTime(
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .expect("valid fixture date"),
    )
}

pub fn record(
    material_no: &str,
    description: &str,
    delivery: (i32, u32, u32),
    quantity: f64,
) -> Vec<CellValue> {
    vec![
        CellValue::text(material_no),
        CellValue::text(description),
        date(delivery),
        CellValue::Number(quantity),
    ]
}

/// A record carrying a value for the `Plant` pass-through column
pub fn record_with(
    material_no: &str,
    description: &str,
    delivery: (i32, u32, u32),
    quantity: f64,
    plant: &str,
) -> Vec<CellValue> {
    let mut row = record(material_no, description, delivery, quantity);
    row.push(CellValue::text(plant));
    row
}

/// Dataset with the business columns, plus `Plant` when any record has it
pub fn dataset(records: Vec<Vec<CellValue>>) -> Dataset {
    let width = records.iter().map(Vec::len).max().unwrap_or(4).clamp(4, 5);
    let columns = DELIVERY_COLUMNS[..width]
        .iter()
        .map(|c| c.to_string())
        .collect();
    Dataset::new(columns, records)
}

/// Temporary directory holding input workbooks for a comparison run
pub struct TestWorkspace {
    pub temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write an input workbook with the tracking column in front of `dataset`
    pub fn write_input(&self, name: &str, dataset: &Dataset) -> PathBuf {
        let path = self.path().join(name);
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        sheet
            .write_string(0, 0, "Sip. Klm. No.")
            .expect("write header");
        for (col, name) in dataset.columns().enumerate() {
            sheet
                .write_string(0, col as u16 + 1, name)
                .expect("write header");
        }

        for (row_idx, row) in dataset.rows().iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            sheet
                .write_number(row_num, 0, row_num as f64)
                .expect("write tracking number");
            for (col_idx, value) in row.iter().enumerate() {
                let col = col_idx as u16 + 1;
                match value {
                    CellValue::Empty => {}
                    CellValue::Bool(b) => {
                        sheet.write_boolean(row_num, col, *b).expect("write bool");
                    }
                    CellValue::Number(n) => {
                        sheet.write_number(row_num, col, *n).expect("write number");
                    }
                    CellValue::DateTime(dt) => {
                        sheet
                            .write_datetime_with_format(row_num, col, dt, &date_format)
                            .expect("write date");
                    }
                    CellValue::Text(s) => {
                        sheet.write_string(row_num, col, s).expect("write text");
                    }
                }
            }
        }

        workbook.save(&path).expect("save input workbook");
        path
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::NaiveDate;
use matdiff_core::CellValue;
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

/// Input header row, tracking column first
pub const INPUT_HEADERS: [&str; 5] = [
    "Sip. Klm. No.",
    "Material No",
    "Material Description",
    "Delivery Date",
    "Quantity",
];

pub fn date(y: i32, m: u32, d: u32) -> CellValue {
    CellValue::DateTime(
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
    )
}

/// One input row without the tracking cell
pub fn delivery(
    material_no: &str,
    description: &str,
    day: (i32, u32, u32),
    qty: f64,
) -> Vec<CellValue> {
    vec![
        CellValue::text(material_no),
        CellValue::text(description),
        date(day.0, day.1, day.2),
        CellValue::Number(qty),
    ]
}

/// Create a temporary test workspace holding input and report files
pub struct TestWorkspace {
    pub temp_dir: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().to_path_buf();
        Self { temp_dir, path }
    }

    /// Get the workspace path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn report_path(&self) -> PathBuf {
        self.path.join("Comparison_Result.xlsx")
    }

    /// Write an input snapshot with the standard headers and a numbered tracking column
    pub fn write_snapshot(&self, name: &str, rows: &[Vec<CellValue>]) -> PathBuf {
        let tracked: Vec<Vec<CellValue>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut full = vec![CellValue::Number((i + 1) as f64)];
                full.extend(row.iter().cloned());
                full
            })
            .collect();
        self.write_workbook(name, &INPUT_HEADERS, &tracked)
    }

    /// Write a single-sheet workbook with arbitrary headers
    pub fn write_workbook(
        &self,
        name: &str,
        headers: &[&str],
        rows: &[Vec<CellValue>],
    ) -> PathBuf {
        let path = self.path.join(name);
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();

        for (col, header) in headers.iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        for (r, row) in rows.iter().enumerate() {
            let row_num = r as u32 + 1;
            for (c, value) in row.iter().enumerate() {
                let col = c as u16;
                match value {
                    CellValue::Empty => {}
                    CellValue::Bool(b) => {
                        sheet.write_boolean(row_num, col, *b).unwrap();
                    }
                    CellValue::Number(n) => {
                        sheet.write_number(row_num, col, *n).unwrap();
                    }
                    CellValue::DateTime(dt) => {
                        sheet
                            .write_datetime_with_format(row_num, col, dt, &date_format)
                            .unwrap();
                    }
                    CellValue::Text(s) => {
                        sheet.write_string(row_num, col, s).unwrap();
                    }
                }
            }
        }

        workbook.save(&path).unwrap();
        path
    }
}

/// Raw XML of one part of a saved xlsx package
pub fn package_part(path: &Path, part: &str) -> String {
    let file = File::open(path).expect("Failed to open report");
    let mut archive = ZipArchive::new(file).expect("Report is not a zip package");
    let mut entry = archive.by_name(part).expect("Missing package part");
    let mut xml = String::new();
    entry.read_to_string(&mut xml).unwrap();
    xml
}

/// Worksheet XML by 1-based position in the workbook
pub fn sheet_xml(path: &Path, position: usize) -> String {
    package_part(path, &format!("xl/worksheets/sheet{position}.xml"))
}

/// Style index of cell `a1` in worksheet XML; cells without a style attribute use 0
pub fn cell_style(sheet_xml: &str, a1: &str) -> Option<u32> {
    let marker = format!("<c r=\"{a1}\"");
    let start = sheet_xml.find(&marker)?;
    let tag_end = start + sheet_xml[start..].find('>')?;
    let tag = &sheet_xml[start..tag_end];
    match tag.find(" s=\"") {
        Some(pos) => {
            let value = &tag[pos + 4..];
            let end = value.find('"')?;
            value[..end].parse().ok()
        }
        None => Some(0),
    }
}

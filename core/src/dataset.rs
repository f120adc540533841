//! In-memory tabular snapshots of material delivery records

use crate::error::{MatdiffError, Result};
use chrono::{NaiveDateTime, NaiveTime};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single spreadsheet cell.
///
/// Integers and floats are both stored as `Number`, so `10` and `10.0`
/// compare equal. Values have a total order (empty < bool < number <
/// date-time < text) which lets them act as sorted grouping keys.
#[derive(Debug, Clone, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::DateTime(_) => 3,
            Self::Text(_) => 4,
        }
    }

    // -0.0 and 0.0 must be the same key
    fn normalized(n: f64) -> f64 {
        if n == 0.0 {
            0.0
        } else {
            n
        }
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Empty, Self::Empty) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => {
                Self::normalized(*a).total_cmp(&Self::normalized(*b))
            }
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Empty => {}
            Self::Bool(b) => b.hash(state),
            Self::Number(n) => Self::normalized(*n).to_bits().hash(state),
            Self::DateTime(dt) => dt.hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::DateTime(dt) if dt.time() == NaiveTime::MIN => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::DateTime(_) | Self::Text(_) => serializer.collect_str(self),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

/// Header names of the fixed business schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Internal tracking column, dropped on load
    pub tracking: String,
    pub material_no: String,
    pub material_description: String,
    pub delivery_date: String,
    pub quantity: String,
    /// Column appended to changed rows
    pub previous_quantity: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            tracking: "Sip. Klm. No.".to_string(),
            material_no: "Material No".to_string(),
            material_description: "Material Description".to_string(),
            delivery_date: "Delivery Date".to_string(),
            quantity: "Quantity".to_string(),
            previous_quantity: "Previous Quantity".to_string(),
        }
    }
}

/// Which snapshot a dataset or row comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Current,
    Previous,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Current => f.write_str("current"),
            Side::Previous => f.write_str("previous"),
        }
    }
}

/// One snapshot: ordered column headers plus rows of cells.
///
/// Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: IndexSet<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset, renaming duplicate headers (`Quantity`, `Quantity.1`)
    /// and padding or truncating rows to the header width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = dedup_headers(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Remove a column and its cells. Returns false if it was not present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some((index, _)) = self.columns.shift_remove_full(name) else {
            return false;
        };
        for row in &mut self.rows {
            row.remove(index);
        }
        true
    }
}

fn dedup_headers(columns: Vec<String>) -> IndexSet<String> {
    let mut unique = IndexSet::with_capacity(columns.len());
    for name in columns {
        if unique.contains(&name) {
            let mut suffix = 1;
            while unique.contains(&format!("{name}.{suffix}")) {
                suffix += 1;
            }
            unique.insert(format!("{name}.{suffix}"));
        } else {
            unique.insert(name);
        }
    }
    unique
}

/// Positions of the business columns inside one dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub material_no: usize,
    pub material_description: usize,
    pub delivery_date: usize,
    pub quantity: usize,
}

impl RecordLayout {
    /// Locate the business columns, failing with a schema error naming the
    /// first missing column and the side it is missing from.
    pub fn resolve(dataset: &Dataset, names: &ColumnNames, side: Side) -> Result<Self> {
        let find = |name: &str| {
            dataset.column_index(name).ok_or_else(|| {
                MatdiffError::schema(format!(
                    "'{}' and '{}' columns must be present in both files; \
                     '{name}' is missing from the {side} dataset",
                    names.material_description, names.material_no
                ))
            })
        };
        let material_description = find(&names.material_description)?;
        let material_no = find(&names.material_no)?;

        let find_required = |name: &str| {
            dataset.column_index(name).ok_or_else(|| {
                MatdiffError::schema(format!(
                    "Required column '{name}' is missing from the {side} dataset"
                ))
            })
        };

        Ok(Self {
            material_no,
            material_description,
            delivery_date: find_required(&names.delivery_date)?,
            quantity: find_required(&names.quantity)?,
        })
    }

    /// List of required columns absent from `dataset`
    pub fn missing_columns<'a>(dataset: &Dataset, names: &'a ColumnNames) -> Vec<&'a str> {
        [
            names.material_no.as_str(),
            names.material_description.as_str(),
            names.delivery_date.as_str(),
            names.quantity.as_str(),
        ]
        .into_iter()
        .filter(|name| !dataset.has_column(name))
        .collect()
    }
}

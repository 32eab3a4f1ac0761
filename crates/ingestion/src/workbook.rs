//! Spreadsheet reader
//!
//! Opens an uploaded workbook from memory, locates the statement sheet and
//! turns it into header-keyed rows of loosely typed cells.

use crate::errors::WorkbookError;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::debug;

/// A single cell as read from the sheet
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date/time
    DateTime(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// JSON leaf for this value; empty cells become `null`
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Empty => Value::Null,
            CellValue::Text(s) | CellValue::DateTime(s) => Value::String(s.clone()),
            CellValue::Int(i) => Value::from(*i),
            // Non-finite floats have no JSON form and map to null
            CellValue::Float(f) => Value::from(*f),
            CellValue::Bool(b) => Value::Bool(*b),
        }
    }

    /// Text form of the value, `None` for empty cells
    pub fn into_text(self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) | CellValue::DateTime(s) => Some(s),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Bool(b) => Some(python_bool(b).to_string()),
        }
    }
}

/// Booleans as text read `True` / `False`
fn python_bool(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// One sheet row: column header -> cell, in sheet column order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: CellValue) {
        self.fields.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every cell is empty
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, CellValue)> {
        self.fields.iter()
    }

    /// Apply `f` to every cell, keeping column order
    pub fn map_values(self, mut f: impl FnMut(CellValue) -> CellValue) -> Self {
        Self {
            fields: self
                .fields
                .into_iter()
                .map(|(name, value)| (name, f(value)))
                .collect(),
        }
    }

    /// Flat JSON object with the columns in sheet order
    pub fn to_json_object(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Where the statement rows live inside the workbook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetLocator {
    /// First sheet, header after this many leading rows
    SkipRows(usize),
    /// Sheet with this exact name, header on its first row
    Named(String),
}

/// Header and data rows of one sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl SheetTable {
    /// Keep only `columns`, in the given order.
    ///
    /// Fails with `SchemaMismatch` naming every column absent from the header.
    pub fn select_columns(self, columns: &[&str]) -> Result<SheetTable, WorkbookError> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|column| !self.headers.iter().any(|h| h == *column))
            .map(|column| column.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(WorkbookError::SchemaMismatch(missing));
        }

        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row.get(column).cloned().unwrap_or(CellValue::Empty);
                        (column.to_string(), value)
                    })
                    .collect()
            })
            .collect();

        Ok(SheetTable {
            sheet: self.sheet,
            headers: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        })
    }
}

/// Read the located sheet of an in-memory workbook (xlsx, xlsm, xlsb, xls, ods)
pub fn read_workbook(bytes: &[u8], locator: &SheetLocator) -> Result<SheetTable, WorkbookError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names();

    let (sheet, skip_rows) = match locator {
        SheetLocator::Named(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(WorkbookError::MissingSheet(name.clone()));
            }
            (name.clone(), 0)
        }
        SheetLocator::SkipRows(skip) => {
            let first = sheet_names
                .first()
                .cloned()
                .ok_or_else(|| WorkbookError::MissingSheet("<first sheet>".to_string()))?;
            (first, *skip)
        }
    };

    let range = workbook.worksheet_range(&sheet)?;
    let (headers, rows) = table_from_range(&range, skip_rows);

    debug!(
        sheet = %sheet,
        columns = headers.len(),
        rows = rows.len(),
        "Sheet read"
    );

    Ok(SheetTable { sheet, headers, rows })
}

/// Split a sheet range into header and rows.
///
/// `skip_rows` counts from the top of the sheet, not from the first used
/// cell; blank rows before the header are ignored. Columns are numbered from
/// column A, so empty leading columns still get `Unnamed: {idx}` headers.
fn table_from_range(range: &Range<Data>, skip_rows: usize) -> (Vec<String>, Vec<Row>) {
    let (first_row, first_col) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));
    let mut remaining = range
        .rows()
        .skip(skip_rows.saturating_sub(first_row))
        .skip_while(|cells| cells.iter().all(|c| matches!(c, Data::Empty)));

    let Some(header_cells) = remaining.next() else {
        return (Vec::new(), Vec::new());
    };
    let mut padded = vec![Data::Empty; first_col];
    padded.extend_from_slice(header_cells);
    let headers = header_names(&padded);

    let rows = remaining
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let value = idx
                        .checked_sub(first_col)
                        .and_then(|col| cells.get(col))
                        .map(cell_value)
                        .unwrap_or(CellValue::Empty);
                    (name.clone(), value)
                })
                .collect()
        })
        .collect();

    (headers, rows)
}

/// Column names from the header row: blanks become `Unnamed: {idx}` and
/// repeats get `.1`, `.2`, ... suffixes.
fn header_names(cells: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();

    cells
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell_value(cell) {
                CellValue::Empty => format!("Unnamed: {}", idx),
                CellValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
                CellValue::Text(s) if s.trim().is_empty() => format!("Unnamed: {}", idx),
                CellValue::Bool(b) => python_bool(b).to_string(),
                other => other.into_text().unwrap_or_default(),
            };

            let mut name = base.clone();
            let mut suffix = 1;
            while !seen.insert(name.clone()) {
                name = format!("{}.{}", base, suffix);
                suffix += 1;
            }
            name
        })
        .collect()
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_date_time(dt),
        Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Date cells become ISO-8601 text in the workbook's own date system;
/// duration cells become `[h]:mm:ss` text.
fn excel_date_time(dt: &ExcelDateTime) -> CellValue {
    if dt.is_duration() {
        if let Some(duration) = dt.as_duration() {
            let seconds = duration.num_seconds();
            let sign = if seconds < 0 { "-" } else { "" };
            let seconds = seconds.abs();
            return CellValue::Text(format!(
                "{}{}:{:02}:{:02}",
                sign,
                seconds / 3600,
                seconds % 3600 / 60,
                seconds % 60
            ));
        }
    } else if let Some(datetime) = dt.as_datetime() {
        return CellValue::DateTime(datetime.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    CellValue::Float(dt.as_f64())
}

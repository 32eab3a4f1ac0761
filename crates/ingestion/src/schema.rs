//! Statement schemas
//!
//! `Flat` reads four fixed task columns after a block of leading rows and
//! stores one statement per row. `Rich` captures a whole named sheet and
//! stores one statement holding every row.

use crate::errors::WorkbookError;
use crate::workbook::{read_workbook, CellValue, Row, SheetLocator, SheetTable};
use finsheet_common::config::{IngestionConfig, StatementSchemaKind};
use finsheet_common::db::StatementPayload;
use serde_json::Value;

/// Sheet headers of the flat schema, in payload order
pub const FLAT_COLUMNS: [&str; 4] = ["Project Name", "Task Name", "Assigned to", "Progress"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatSchema {
    pub skip_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichSchema {
    pub sheet_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSchema {
    Flat(FlatSchema),
    Rich(RichSchema),
}

impl StatementSchema {
    pub fn from_config(config: &IngestionConfig) -> Self {
        match config.schema {
            StatementSchemaKind::Flat => StatementSchema::Flat(FlatSchema {
                skip_rows: config.skip_rows,
            }),
            StatementSchemaKind::Rich => StatementSchema::Rich(RichSchema {
                sheet_name: config.sheet_name.clone(),
            }),
        }
    }

    pub fn kind(&self) -> StatementSchemaKind {
        match self {
            StatementSchema::Flat(_) => StatementSchemaKind::Flat,
            StatementSchema::Rich(_) => StatementSchemaKind::Rich,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StatementSchema::Flat(_) => "flat",
            StatementSchema::Rich(_) => "rich",
        }
    }

    pub fn locator(&self) -> SheetLocator {
        match self {
            StatementSchema::Flat(flat) => SheetLocator::SkipRows(flat.skip_rows),
            StatementSchema::Rich(rich) => SheetLocator::Named(rich.sheet_name.clone()),
        }
    }

    /// Read the workbook; the flat schema also narrows it to its columns.
    pub fn parse(&self, bytes: &[u8]) -> Result<SheetTable, WorkbookError> {
        let table = read_workbook(bytes, &self.locator())?;
        match self {
            StatementSchema::Flat(_) => table.select_columns(&FLAT_COLUMNS),
            StatementSchema::Rich(_) => Ok(table),
        }
    }

    /// Statement records for normalized rows.
    ///
    /// Flat yields one payload per row; rich yields exactly one payload, even
    /// for a sheet without rows.
    pub fn payloads(&self, rows: &[Row]) -> Vec<StatementPayload> {
        match self {
            StatementSchema::Flat(_) => rows.iter().map(flat_payload).collect(),
            StatementSchema::Rich(_) => {
                let data = rows
                    .iter()
                    .map(|row| Value::Object(row.to_json_object()))
                    .collect();
                vec![StatementPayload::Rows(Value::Array(data))]
            }
        }
    }
}

fn flat_payload(row: &Row) -> StatementPayload {
    let text = |column: &str| row.get(column).cloned().and_then(CellValue::into_text);

    StatementPayload::Flat {
        project_name: text(FLAT_COLUMNS[0]),
        task_name: text(FLAT_COLUMNS[1]),
        assigned_to: text(FLAT_COLUMNS[2]),
        progress: text(FLAT_COLUMNS[3]),
    }
}

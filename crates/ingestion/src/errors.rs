//! Workbook reader error types

use finsheet_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Workbook could not be parsed: {0}")]
    InvalidFormat(String),

    #[error("Sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("Missing expected columns: {}", .0.join(", "))]
    SchemaMismatch(Vec<String>),
}

impl From<calamine::Error> for WorkbookError {
    fn from(e: calamine::Error) -> Self {
        WorkbookError::InvalidFormat(e.to_string())
    }
}

impl From<WorkbookError> for AppError {
    fn from(e: WorkbookError) -> Self {
        match e {
            WorkbookError::InvalidFormat(message) => AppError::InvalidFormat { message },
            WorkbookError::MissingSheet(sheet) => AppError::MissingSheet { sheet },
            WorkbookError::SchemaMismatch(missing) => AppError::SchemaMismatch { missing },
        }
    }
}

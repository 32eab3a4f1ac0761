//! API handlers module

pub mod companies;
pub mod extract;
pub mod financials;
pub mod health;

use finsheet_common::errors::{AppError, Result};

/// Parse a company id path segment
pub(crate) fn parse_company_id(raw: &str) -> Result<i32> {
    raw.parse().map_err(|_| AppError::Validation {
        message: format!("Invalid company id: {}", raw),
        field: Some("company_id".to_string()),
    })
}

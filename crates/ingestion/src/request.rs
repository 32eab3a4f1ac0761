//! Extract request validation
//!
//! Turns the raw upload (file plus form fields) into a validated request
//! before anything touches the store.

use crate::resolver::normalize_company_name;
use finsheet_common::config::StatementSchemaKind;
use finsheet_common::db::NewCompany;
use finsheet_common::errors::{AppError, Result};
use validator::Validate;

const ALL_FIELDS_REQUIRED: &str = "All fields are required";
const NO_FILE_OR_COMPANY: &str = "No file or company name provided";
const INVALID_NUMBER: &str = "Invalid data type provided for stock price or GDP change";

/// Workbook part of the upload
#[derive(Debug, Clone, Default)]
pub struct UploadedWorkbook {
    /// Client-supplied filename, compared byte-for-byte for duplicates
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

/// Company fields as submitted.
///
/// The derive rules are the rich-schema rules: every field present and
/// non-empty.
#[derive(Debug, Clone, Default, Validate)]
pub struct CompanyFields {
    #[validate(required, length(min = 1))]
    pub company_name: Option<String>,

    #[validate(required, length(min = 1))]
    pub country: Option<String>,

    #[validate(required, length(min = 1))]
    pub stock_symbol: Option<String>,

    #[validate(required, length(min = 1))]
    pub sector: Option<String>,

    #[validate(required, length(min = 1))]
    pub stock_price: Option<String>,

    #[validate(required, length(min = 1))]
    pub gdp_change: Option<String>,
}

/// Raw extract request
#[derive(Debug, Clone, Default)]
pub struct ExtractRequest {
    pub file: Option<UploadedWorkbook>,
    pub fields: CompanyFields,
}

/// Request that passed validation
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Company with canonicalized name and attributes
    pub company: NewCompany,
}

impl ExtractRequest {
    /// Validate the request for the given statement schema.
    ///
    /// Rich statements require every company attribute; flat statements only
    /// need the file and company name. Numeric attributes that are present
    /// must parse as finite numbers.
    pub fn validate(self, schema: StatementSchemaKind) -> Result<ValidatedRequest> {
        let filename = self
            .file
            .as_ref()
            .and_then(|f| f.filename.as_deref())
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let missing_message = match schema {
            StatementSchemaKind::Rich => {
                self.fields.trimmed_text().validate().map_err(|e| AppError::Validation {
                    message: ALL_FIELDS_REQUIRED.to_string(),
                    field: first_invalid_field(&e),
                })?;
                ALL_FIELDS_REQUIRED
            }
            StatementSchemaKind::Flat => NO_FILE_OR_COMPANY,
        };

        let (Some(filename), Some(file)) = (filename, self.file) else {
            return Err(AppError::Validation {
                message: missing_message.to_string(),
                field: Some("file".to_string()),
            });
        };

        let numbers_required = schema == StatementSchemaKind::Rich;
        let fields = self.fields;
        let raw_name = fields
            .company_name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation {
                message: missing_message.to_string(),
                field: Some("company_name".to_string()),
            })?;

        let name = normalize_company_name(&raw_name);
        if name.is_empty() {
            return Err(AppError::Validation {
                message: "Company name must not be blank".to_string(),
                field: Some("company_name".to_string()),
            });
        }

        let company = NewCompany {
            name,
            country: canonical_text(fields.country, str::to_lowercase),
            stock_symbol: canonical_text(fields.stock_symbol, str::to_uppercase),
            sector: canonical_text(fields.sector, str::to_lowercase),
            stock_price: parse_number(fields.stock_price, "stock_price", numbers_required)?,
            gdp_change: parse_number(fields.gdp_change, "gdp_change", numbers_required)?,
        };

        Ok(ValidatedRequest {
            filename,
            bytes: file.bytes,
            company,
        })
    }
}

impl CompanyFields {
    /// Text attributes trimmed, so whitespace alone counts as missing.
    /// Numeric attributes are left for number parsing to reject.
    fn trimmed_text(&self) -> CompanyFields {
        let trim = |value: &Option<String>| value.as_deref().map(|v| v.trim().to_string());
        CompanyFields {
            company_name: trim(&self.company_name),
            country: trim(&self.country),
            stock_symbol: trim(&self.stock_symbol),
            sector: trim(&self.sector),
            stock_price: self.stock_price.clone(),
            gdp_change: self.gdp_change.clone(),
        }
    }
}

fn first_invalid_field(errors: &validator::ValidationErrors) -> Option<String> {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    fields.into_iter().next()
}

fn canonical_text(value: Option<String>, case: fn(&str) -> String) -> Option<String> {
    value
        .map(|v| case(v.trim()))
        .filter(|v| !v.is_empty())
}

/// Parse a numeric attribute. A blank value is absent unless `required`,
/// in which case it is as invalid as any other non-number.
fn parse_number(value: Option<String>, field: &str, required: bool) -> Result<Option<f64>> {
    let raw = match value {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ if !required => return Ok(None),
        _ => String::new(),
    };

    match raw.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ => Err(AppError::Validation {
            message: INVALID_NUMBER.to_string(),
            field: Some(field.to_string()),
        }),
    }
}

//! Error types for Finsheet services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for each ingestion failure mode
//! - HTTP status code mapping
//! - The uniform `{message, success, data}` response envelope
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    PayloadTooLarge,

    // Workbook errors (2xxx)
    InvalidFormat,
    MissingSheet,
    SchemaMismatch,

    // Resource errors (4xxx)
    NotFound,
    CompanyNotFound,

    // Conflict errors (5xxx)
    AlreadyUploaded,
    DuplicateCompany,

    // Database errors (7xxx)
    PersistenceError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::PayloadTooLarge => 1004,

            // Workbook (2xxx)
            ErrorCode::InvalidFormat => 2001,
            ErrorCode::MissingSheet => 2002,
            ErrorCode::SchemaMismatch => 2003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::CompanyNotFound => 4002,

            // Conflicts (5xxx)
            ErrorCode::AlreadyUploaded => 5001,
            ErrorCode::DuplicateCompany => 5002,

            // Database (7xxx)
            ErrorCode::PersistenceError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    // Workbook errors
    #[error("Invalid workbook format: {message}")]
    InvalidFormat { message: String },

    #[error("Sheet '{sheet}' not found in workbook")]
    MissingSheet { sheet: String },

    #[error("Workbook is missing expected columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    // Resource errors
    #[error("No {resource} found")]
    NoneFound { resource: String },

    #[error("Company with id {id} not found")]
    CompanyNotFound { id: i32 },

    // Conflict errors
    #[error("File has already been uploaded for another company")]
    AlreadyUploaded { filename: String },

    #[error("Company already exists")]
    DuplicateCompany { name: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::MissingSheet { .. } => ErrorCode::MissingSheet,
            AppError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            AppError::NoneFound { .. } => ErrorCode::NotFound,
            AppError::CompanyNotFound { .. } => ErrorCode::CompanyNotFound,
            AppError::AlreadyUploaded { .. } => ErrorCode::AlreadyUploaded,
            AppError::DuplicateCompany { .. } => ErrorCode::DuplicateCompany,
            AppError::Database(_) => ErrorCode::PersistenceError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::InvalidFormat { .. } |
            AppError::MissingSheet { .. } |
            AppError::SchemaMismatch { .. } |
            AppError::AlreadyUploaded { .. } |
            AppError::DuplicateCompany { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NoneFound { .. } |
            AppError::CompanyNotFound { .. } => StatusCode::NOT_FOUND,

            // 413 Payload Too Large
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::DatabaseConnection { .. } |
            AppError::Internal { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Translate a failed insert into the conflict it represents.
    ///
    /// Unique-constraint violations become the error built by `conflict`;
    /// anything else stays a persistence error.
    pub fn from_insert(err: DbErr, conflict: impl FnOnce() -> AppError) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => conflict(),
            _ => AppError::Database(err),
        }
    }
}

/// Uniform response envelope for every API endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub message: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying data
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: Some(data),
        }
    }

    /// Successful response without data
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: true,
            data: None,
        }
    }
}

/// Machine-readable detail attached to failed responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match self {
            AppError::Validation { field, .. } => field,
            _ => None,
        };

        let body = ApiResponse {
            message,
            success: false,
            data: Some(ErrorDetails { code, field }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

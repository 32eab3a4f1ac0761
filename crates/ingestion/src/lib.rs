//! Finsheet Ingestion
//!
//! Turns an uploaded workbook into persisted company statements:
//! 1. Validates the request
//! 2. Rejects filenames that were already ingested
//! 3. Resolves (or creates) the owning company
//! 4. Reads and normalizes the statement rows
//! 5. Persists everything in one transaction

pub mod errors;
pub mod guard;
pub mod normalizer;
pub mod processor;
pub mod request;
pub mod resolver;
pub mod schema;
pub mod workbook;

pub use errors::WorkbookError;
pub use processor::{IngestionFailure, IngestionProcessor, IngestionReceipt, IngestionStage};
pub use request::{CompanyFields, ExtractRequest, UploadedWorkbook};
pub use schema::StatementSchema;


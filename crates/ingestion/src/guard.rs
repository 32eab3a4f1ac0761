//! Duplicate guard
//!
//! Rejects a workbook whose filename was already accepted. The check runs
//! inside the request's unit of work and the reservation is written by the
//! same transaction, so a failed ingestion never leaves the filename taken.

use finsheet_common::db::models::UploadedFile;
use finsheet_common::db::UnitOfWork;
use finsheet_common::errors::{AppError, Result};
use tracing::debug;

/// A filename that passed the duplicate check and awaits its company
#[derive(Debug)]
#[must_use = "a reservation is only stored once bound to a company"]
pub struct Reservation {
    filename: String,
}

impl Reservation {
    /// Store the reservation for `company_id` in the unit of work.
    ///
    /// A concurrent request that committed the same filename first makes this
    /// fail with `AlreadyUploaded` through the unique constraint.
    pub async fn bind(self, uow: &UnitOfWork, company_id: i32) -> Result<UploadedFile> {
        uow.insert_uploaded_file(&self.filename, company_id).await
    }
}

/// Accept `filename` if no upload with exactly this name exists.
pub async fn check_and_reserve(uow: &UnitOfWork, filename: &str) -> Result<Reservation> {
    if let Some(existing) = uow.find_uploaded_file(filename).await? {
        debug!(
            filename = %filename,
            company_id = existing.company_id,
            "Filename already uploaded"
        );
        return Err(AppError::AlreadyUploaded {
            filename: filename.to_string(),
        });
    }

    Ok(Reservation {
        filename: filename.to_string(),
    })
}

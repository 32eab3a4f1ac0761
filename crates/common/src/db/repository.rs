//! Repository for read-side database operations
//!
//! Every lookup goes to the store; nothing is cached in-process.
//! Writes happen through a [`UnitOfWork`] opened with [`Repository::begin`].

use crate::db::models::*;
use crate::db::{DbPool, UnitOfWork};
use crate::errors::Result;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Open a unit of work on the primary connection
    pub async fn begin(&self) -> Result<UnitOfWork> {
        let txn = self.write_conn().begin().await?;
        Ok(UnitOfWork::new(txn))
    }

    // ========================================================================
    // Company Operations
    // ========================================================================

    /// List all companies in creation order
    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        CompanyEntity::find()
            .order_by_asc(CompanyColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find company by ID
    pub async fn find_company_by_id(&self, id: i32) -> Result<Option<Company>> {
        CompanyEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Statement Operations
    // ========================================================================

    /// List statements of a company in insertion order
    pub async fn list_statements_for_company(&self, company_id: i32) -> Result<Vec<FinancialStatement>> {
        FinancialStatementEntity::find()
            .filter(FinancialStatementColumn::CompanyId.eq(company_id))
            .order_by_asc(FinancialStatementColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find uploaded file record by exact filename
    pub async fn find_uploaded_file(&self, filename: &str) -> Result<Option<UploadedFile>> {
        UploadedFileEntity::find()
            .filter(UploadedFileColumn::Filename.eq(filename))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

//! Transactional unit of work
//!
//! One ingestion request owns one `UnitOfWork`. The filename reservation,
//! the company insert and the statement inserts all go through the same
//! transaction, so they become visible together on [`UnitOfWork::commit`]
//! or not at all. Dropping an uncommitted unit of work rolls it back.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
};
use serde_json::Value;

/// Attributes of a company about to be created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCompany {
    pub name: String,
    pub country: Option<String>,
    pub stock_symbol: Option<String>,
    pub sector: Option<String>,
    pub stock_price: Option<f64>,
    pub gdp_change: Option<f64>,
}

impl NewCompany {
    /// Company with a name and no descriptive attributes
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Content of one statement record
#[derive(Debug, Clone, PartialEq)]
pub enum StatementPayload {
    /// One sheet row mapped onto the four task columns
    Flat {
        project_name: Option<String>,
        task_name: Option<String>,
        assigned_to: Option<String>,
        progress: Option<String>,
    },
    /// Every sheet row as a JSON array of flat objects
    Rows(Value),
}

/// Write-side handle scoped to a single transaction
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    pub(crate) fn new(txn: DatabaseTransaction) -> Self {
        Self { txn }
    }

    /// Find an uploaded file by exact, case-sensitive filename
    pub async fn find_uploaded_file(&self, filename: &str) -> Result<Option<UploadedFile>> {
        UploadedFileEntity::find()
            .filter(UploadedFileColumn::Filename.eq(filename))
            .one(&self.txn)
            .await
            .map_err(Into::into)
    }

    /// Record a filename for a company.
    ///
    /// A concurrent request that committed the same filename first surfaces
    /// here as [`AppError::AlreadyUploaded`].
    pub async fn insert_uploaded_file(&self, filename: &str, company_id: i32) -> Result<UploadedFile> {
        let file = UploadedFileActiveModel {
            filename: Set(filename.to_string()),
            company_id: Set(company_id),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        file.insert(&self.txn).await.map_err(|e| {
            AppError::from_insert(e, || AppError::AlreadyUploaded {
                filename: filename.to_string(),
            })
        })
    }

    /// Find a company by its normalized name
    pub async fn find_company_by_name(&self, name: &str) -> Result<Option<Company>> {
        CompanyEntity::find()
            .filter(CompanyColumn::Name.eq(name))
            .one(&self.txn)
            .await
            .map_err(Into::into)
    }

    /// Create a company.
    ///
    /// A name taken by a concurrent request surfaces as
    /// [`AppError::DuplicateCompany`].
    pub async fn insert_company(&self, company: NewCompany) -> Result<Company> {
        let name = company.name.clone();
        let model = CompanyActiveModel {
            name: Set(company.name),
            country: Set(company.country),
            stock_symbol: Set(company.stock_symbol),
            sector: Set(company.sector),
            stock_price: Set(company.stock_price),
            gdp_change: Set(company.gdp_change),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
            ..Default::default()
        };

        model
            .insert(&self.txn)
            .await
            .map_err(|e| AppError::from_insert(e, || AppError::DuplicateCompany { name }))
    }

    /// Create a statement record for a company
    pub async fn insert_statement(
        &self,
        company_id: i32,
        payload: StatementPayload,
    ) -> Result<FinancialStatement> {
        let mut model = FinancialStatementActiveModel {
            company_id: Set(company_id),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
            ..Default::default()
        };

        match payload {
            StatementPayload::Flat { project_name, task_name, assigned_to, progress } => {
                model.project_name = Set(project_name);
                model.task_name = Set(task_name);
                model.assigned_to = Set(assigned_to);
                model.progress = Set(progress);
                model.data = Set(None);
            }
            StatementPayload::Rows(rows) => {
                model.project_name = Set(None);
                model.task_name = Set(None);
                model.assigned_to = Set(None);
                model.progress = Set(None);
                model.data = Set(Some(rows));
            }
        }

        model.insert(&self.txn).await.map_err(Into::into)
    }

    /// Make every write of this unit visible
    pub async fn commit(self) -> Result<()> {
        self.txn.commit().await.map_err(Into::into)
    }

    /// Discard every write of this unit
    pub async fn rollback(self) -> Result<()> {
        self.txn.rollback().await.map_err(Into::into)
    }
}

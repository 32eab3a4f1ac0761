//! SeaORM entity models
//!
//! Database entities for Finsheet

mod company;
mod financial_statement;
mod uploaded_file;

pub use company::{
    Entity as CompanyEntity,
    Model as Company,
    ActiveModel as CompanyActiveModel,
    Column as CompanyColumn,
};

pub use uploaded_file::{
    Entity as UploadedFileEntity,
    Model as UploadedFile,
    ActiveModel as UploadedFileActiveModel,
    Column as UploadedFileColumn,
};

pub use financial_statement::{
    Entity as FinancialStatementEntity,
    Model as FinancialStatement,
    ActiveModel as FinancialStatementActiveModel,
    Column as FinancialStatementColumn,
};

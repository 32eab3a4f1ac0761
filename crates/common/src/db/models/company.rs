//! Company entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "company")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Lowercased, trimmed company name
    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub country: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub stock_symbol: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub sector: Option<String>,

    pub stock_price: Option<f64>,

    pub gdp_change: Option<f64>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::financial_statement::Entity")]
    FinancialStatements,

    #[sea_orm(has_many = "super::uploaded_file::Entity")]
    UploadedFiles,
}

impl Related<super::financial_statement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialStatements.def()
    }
}

impl Related<super::uploaded_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UploadedFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

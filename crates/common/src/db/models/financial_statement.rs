//! Financial statement entity
//!
//! Flat statements fill the four task columns, one record per sheet row.
//! Rich statements keep every row of the sheet in `data` as a JSON array.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_statement")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_id: i32,

    #[sea_orm(column_type = "Text", nullable)]
    pub project_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub task_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub assigned_to: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub progress: Option<String>,

    #[sea_orm(column_type = "Json", nullable)]
    pub data: Option<Json>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Number of sheet rows this statement holds
    pub fn row_count(&self) -> usize {
        match &self.data {
            Some(Json::Array(rows)) => rows.len(),
            Some(_) => 0,
            None => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::company::Entity",
        from = "Column::CompanyId",
        to = "super::company::Column::Id"
    )]
    Company,
}

impl Related<super::company::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Company.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Financial statement read handlers

use crate::handlers::parse_company_id;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use finsheet_common::{
    db::models::FinancialStatement,
    errors::{ApiResponse, AppError, Result},
};

/// Statements of one company in insertion order; 404 for an unknown company
pub async fn list_financials(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<FinancialStatement>>>> {
    let id = parse_company_id(&company_id)?;
    if state.repository.find_company_by_id(id).await?.is_none() {
        return Err(AppError::CompanyNotFound { id });
    }

    let statements = state.repository.list_statements_for_company(id).await?;
    Ok(Json(ApiResponse::ok(
        "Financial statements retrieved successfully",
        statements,
    )))
}

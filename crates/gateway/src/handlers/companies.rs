//! Company read handlers

use crate::handlers::parse_company_id;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use finsheet_common::{
    db::models::Company,
    errors::{ApiResponse, AppError, Result},
};

/// List every company; 404 when there are none yet
pub async fn list_companies(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Company>>>> {
    let companies = state.repository.list_companies().await?;
    if companies.is_empty() {
        return Err(AppError::NoneFound {
            resource: "companies".to_string(),
        });
    }

    Ok(Json(ApiResponse::ok("Companies retrieved successfully", companies)))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<Json<ApiResponse<Company>>> {
    let id = parse_company_id(&company_id)?;
    let company = state
        .repository
        .find_company_by_id(id)
        .await?
        .ok_or(AppError::CompanyNotFound { id })?;

    Ok(Json(ApiResponse::ok("Company retrieved successfully", company)))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{CompanyRequest, ValidatedJson};
use crate::models::Company;
use crate::startup::AppState;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Company not found"))
}

#[tracing::instrument(skip(state))]
pub async fn list_companies(State(state): State<AppState>) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(state.db.list_companies().await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_company(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let company = state.db.create_company(&request.into_input()).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

#[tracing::instrument(skip(state))]
pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    let company = state.db.get_company(company_id).await?.ok_or_else(not_found)?;
    Ok(Json(company))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<CompanyRequest>,
) -> Result<Json<Company>, AppError> {
    let company = state
        .db
        .update_company(company_id, &request.into_input())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(company))
}

#[tracing::instrument(skip(state))]
pub async fn delete_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_company(company_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{field_error, ClientRequest, ClientResponse, ValidatedJson};
use crate::models::{Client, ClientInput, Company};
use crate::startup::AppState;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Client not found"))
}

/// Reject link sets naming companies that do not exist.
async fn check_companies(state: &AppState, input: &ClientInput) -> Result<(), AppError> {
    let missing = state.db.missing_company_ids(&input.company_ids).await?;
    if missing.is_empty() {
        return Ok(());
    }

    let ids: Vec<String> = missing.iter().map(Uuid::to_string).collect();
    Err(field_error(
        "company_ids",
        "unknown_company",
        format!("Unknown company ids: {}", ids.join(", ")),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn list_clients(State(state): State<AppState>) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(state.db.list_clients().await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_client(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    let input = request.into_input();
    check_companies(&state, &input).await?;

    let client = state.db.create_client(&input).await?;
    let companies = state.db.get_client_companies(client.client_id).await?;

    Ok((StatusCode::CREATED, Json(ClientResponse { client, companies })))
}

#[tracing::instrument(skip(state))]
pub async fn get_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state.db.get_client(client_id).await?.ok_or_else(not_found)?;
    let companies = state.db.get_client_companies(client_id).await?;
    Ok(Json(ClientResponse { client, companies }))
}

#[tracing::instrument(skip(state))]
pub async fn get_client_companies(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Vec<Company>>, AppError> {
    state.db.get_client(client_id).await?.ok_or_else(not_found)?;
    Ok(Json(state.db.get_client_companies(client_id).await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ClientRequest>,
) -> Result<Json<ClientResponse>, AppError> {
    let input = request.into_input();
    check_companies(&state, &input).await?;

    let client = state
        .db
        .update_client(client_id, &input)
        .await?
        .ok_or_else(not_found)?;
    let companies = state.db.get_client_companies(client_id).await?;

    Ok(Json(ClientResponse { client, companies }))
}

#[tracing::instrument(skip(state))]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_client(client_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

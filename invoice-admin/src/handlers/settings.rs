use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{UpdateSettingsRequest, ValidatedJson};
use crate::models::Settings;
use crate::startup::AppState;

#[tracing::instrument(skip(state))]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.db.get_or_create_settings().await?))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_settings(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateSettingsRequest>,
) -> Result<Json<Settings>, AppError> {
    let settings = state.db.update_settings(&request.into_input()).await?;
    Ok(Json(settings))
}

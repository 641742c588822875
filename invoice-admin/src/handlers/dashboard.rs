use axum::{extract::State, Json};
use chrono::Utc;
use service_core::error::AppError;

use crate::services::metrics::ANALYTICS_DURATION;
use crate::services::{compute_statistics, DashboardStatistics};
use crate::startup::AppState;

/// Recompute the dashboard from every live invoice.
#[tracing::instrument(skip(state))]
pub async fn statistics(State(state): State<AppState>) -> Result<Json<DashboardStatistics>, AppError> {
    let timer = ANALYTICS_DURATION.start_timer();

    let snapshot = state.db.load_analytics_snapshot().await?;
    let stats = compute_statistics(
        snapshot.total_clients,
        &snapshot.invoices,
        Utc::now().date_naive(),
    );

    timer.observe_duration();

    tracing::info!(
        invoices = snapshot.invoices.len(),
        clients_with_outstanding = stats.clients_with_outstanding.len(),
        "Dashboard statistics computed"
    );

    Ok(Json(stats))
}

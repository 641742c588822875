//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use service_core::error::{AppError, ErrorKind};
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::tracing::{make_request_span, request_id_middleware};
use service_core::retry::RetryConfig;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::InvoiceAdminConfig;
use crate::handlers::{
    clients, companies, dashboard, health_check, invoices, metrics_handler, readiness_check,
    settings,
};
use crate::services::metrics::record_error;
use crate::services::{init_metrics, Database};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceAdminConfig,
    pub db: Arc<Database>,
    /// Budget for rerunning invoice creation after a number collision.
    pub retry: RetryConfig,
}

impl AppState {
    pub fn new(config: InvoiceAdminConfig, db: Arc<Database>) -> Self {
        let retry = RetryConfig::with_max_retries(config.numbering.max_retries);
        Self { config, db, retry }
    }
}

/// Count every error response by its kind.
async fn error_metrics_middleware(req: Request, next: Next) -> Response {
    let response = next.run(req).await;
    if let Some(ErrorKind(kind)) = response.extensions().get::<ErrorKind>() {
        record_error(kind);
    }
    response
}

/// Full HTTP surface, with the observability layers applied.
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.common.request_timeout_secs);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/companies",
            get(companies::list_companies).post(companies::create_company),
        )
        .route(
            "/companies/:id",
            get(companies::get_company)
                .put(companies::update_company)
                .delete(companies::delete_company),
        )
        .route(
            "/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route("/clients/:id/companies", get(clients::get_client_companies))
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/invoices/:id/document", get(invoices::get_invoice_document))
        .route("/dashboard/statistics", get(dashboard::statistics))
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .layer(middleware::from_fn(error_metrics_middleware))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: InvoiceAdminConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    pub async fn build_without_migrations(config: InvoiceAdminConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: InvoiceAdminConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "invoice-admin listener bound");

        Ok(Self {
            port,
            listener,
            state: AppState::new(config, Arc::new(db)),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        tracing::info!(
            service = %self.state.config.service_name,
            version = %self.state.config.service_version,
            port = self.port,
            "Service ready to accept connections"
        );

        let app = router(self.state);
        axum::serve(self.listener, app).await.map_err(|e| {
            tracing::error!(error = %e, "HTTP server error");
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

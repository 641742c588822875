use std::borrow::Cow;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use service_core::error::AppError;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

use crate::dtos::{field_error, InvoiceDocument, InvoiceRequest, InvoiceResponse, ValidatedJson};
use crate::models::{Client, Company, NewInvoice};
use crate::services::metrics::{INVOICES_CREATED_TOTAL, INVOICES_UPDATED_TOTAL};
use crate::services::totals::TotalsError;
use crate::services::{compute_invoice, ComputedInvoice};
use crate::startup::AppState;

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Invoice not found"))
}

/// Both referenced rows must be live; each miss is its own field error.
async fn resolve_parties(state: &AppState, input: &NewInvoice) -> Result<(Company, Client), AppError> {
    let company = state.db.get_company(input.company_id).await?;
    let client = state.db.get_client(input.client_id).await?;

    match (company, client) {
        (Some(company), Some(client)) => Ok((company, client)),
        (company, client) => {
            let mut errors = ValidationErrors::new();
            if company.is_none() {
                let mut error = ValidationError::new("exists");
                error.message = Some(Cow::Borrowed("Company does not exist"));
                errors.add("company_id", error);
            }
            if client.is_none() {
                let mut error = ValidationError::new("exists");
                error.message = Some(Cow::Borrowed("Client does not exist"));
                errors.add("client_id", error);
            }
            Err(AppError::ValidationError(errors))
        }
    }
}

fn compute(input: &NewInvoice) -> Result<ComputedInvoice, AppError> {
    compute_invoice(&input.items).map_err(|e| {
        let code = match e {
            TotalsError::NoItems | TotalsError::TooManyItems => "length",
            TotalsError::LineOverflow { .. } | TotalsError::TotalOverflow => "range",
        };
        field_error("items", code, e.to_string())
    })
}

#[tracing::instrument(skip(state))]
pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let invoices = state
        .db
        .list_invoices()
        .await?
        .into_iter()
        .map(|(invoice, items)| InvoiceResponse {
            invoice,
            company: None,
            client: None,
            items,
        })
        .collect();
    Ok(Json(invoices))
}

#[tracing::instrument(skip(state, request))]
pub async fn create_invoice(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<InvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    let input = request.into_new_invoice()?;
    let computed = compute(&input)?;
    let (company, client) = resolve_parties(&state, &input).await?;

    let year = Utc::now().year();
    let (invoice, items) = state
        .db
        .create_invoice(&input, &computed, year, &state.retry)
        .await?;

    INVOICES_CREATED_TOTAL
        .with_label_values(&[input.status.as_str()])
        .inc();

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse {
            invoice,
            company: Some(company),
            client: Some(client),
            items,
        }),
    ))
}

#[tracing::instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.db.get_invoice(invoice_id).await?.ok_or_else(not_found)?;
    let items = state.db.get_invoice_items(invoice_id).await?;
    let company = state.db.get_company(invoice.company_id).await?;
    let client = state.db.get_client(invoice.client_id).await?;

    Ok(Json(InvoiceResponse {
        invoice,
        company,
        client,
        items,
    }))
}

#[tracing::instrument(skip(state, request))]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<InvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let input = request.into_new_invoice()?;
    let computed = compute(&input)?;
    let (company, client) = resolve_parties(&state, &input).await?;

    let (invoice, items) = state
        .db
        .update_invoice(invoice_id, &input, &computed)
        .await?
        .ok_or_else(not_found)?;

    INVOICES_UPDATED_TOTAL
        .with_label_values(&[input.status.as_str()])
        .inc();

    Ok(Json(InvoiceResponse {
        invoice,
        company: Some(company),
        client: Some(client),
        items,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.db.delete_invoice(invoice_id).await? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Data for printing an invoice, without internal cost prices.
#[tracing::instrument(skip(state))]
pub async fn get_invoice_document(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDocument>, AppError> {
    let invoice = state.db.get_invoice(invoice_id).await?.ok_or_else(not_found)?;
    let items = state.db.get_invoice_items(invoice_id).await?;
    let company = state.db.get_company(invoice.company_id).await?;
    let client = state.db.get_client(invoice.client_id).await?;
    let settings = state.db.get_or_create_settings().await?;

    Ok(Json(InvoiceDocument::new(
        settings, invoice, company, client, items,
    )))
}

use std::borrow::Cow;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{field_error, validate_amount, validate_storable, RequestFields};
use crate::models::{
    Client, Company, Invoice, InvoiceItem, InvoiceStatus, NewInvoice, NewInvoiceItem, PaymentTerms,
    Settings,
};

/// Smallest billable quantity.
const MIN_QUANTITY: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

fn validate_quantity(quantity: &Decimal) -> Result<(), ValidationError> {
    if *quantity < MIN_QUANTITY {
        let mut error = ValidationError::new("range");
        error.message = Some(Cow::Borrowed("Quantity must be at least 0.01"));
        return Err(error);
    }
    validate_storable(quantity)
}

fn validate_assignable_status(status: &InvoiceStatus) -> Result<(), ValidationError> {
    if !status.is_assignable() {
        let mut error = ValidationError::new("status");
        error.message = Some(Cow::Borrowed(
            "Status must be one of draft, unpaid, partially_paid, paid",
        ));
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct InvoiceItemRequest {
    #[validate(
        required(message = "Description is required"),
        length(min = 1, message = "Description is required")
    )]
    pub description: Option<String>,
    #[validate(
        required(message = "Quantity is required"),
        custom(function = "validate_quantity")
    )]
    pub quantity: Option<Decimal>,
    #[validate(custom(function = "validate_amount"))]
    pub cost_price: Option<Decimal>,
    #[validate(
        required(message = "Unit price is required"),
        custom(function = "validate_amount")
    )]
    pub unit_price: Option<Decimal>,
}

/// Body for both create and update.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct InvoiceRequest {
    #[validate(required(message = "Company is required"))]
    pub company_id: Option<Uuid>,
    #[validate(required(message = "Client is required"))]
    pub client_id: Option<Uuid>,
    #[validate(required(message = "Date is required"))]
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(required(message = "Payment terms are required"))]
    pub payment_terms: Option<PaymentTerms>,
    #[validate(
        required(message = "Status is required"),
        custom(function = "validate_assignable_status")
    )]
    pub status: Option<InvoiceStatus>,
    #[validate(custom(function = "validate_amount"))]
    pub balance_due: Option<Decimal>,
    pub note: Option<String>,
    /// References to files already stored elsewhere.
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "Items are required"), nested)]
    pub items: Vec<InvoiceItemRequest>,
}

impl RequestFields for InvoiceItemRequest {
    const FIELDS: &'static [&'static str] = &["description", "quantity", "cost_price", "unit_price"];
}

impl RequestFields for InvoiceRequest {
    const FIELDS: &'static [&'static str] = &[
        "company_id",
        "client_id",
        "date",
        "due_date",
        "payment_terms",
        "status",
        "balance_due",
        "note",
        "attachments",
        "items",
    ];
    const LIST_FIELDS: &'static [(&'static str, &'static [&'static str])] =
        &[("items", InvoiceItemRequest::FIELDS)];
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or_else(|| field_error(field, "required", format!("{} is required", field)))
}

impl InvoiceItemRequest {
    fn into_item(self) -> Result<NewInvoiceItem, AppError> {
        Ok(NewInvoiceItem {
            description: required(self.description, "description")?,
            quantity: required(self.quantity, "quantity")?,
            unit_price: required(self.unit_price, "unit_price")?,
            cost_price: self.cost_price,
        })
    }
}

impl InvoiceRequest {
    /// Convert a validated request into the domain input.
    pub fn into_new_invoice(self) -> Result<NewInvoice, AppError> {
        let items = self
            .items
            .into_iter()
            .map(InvoiceItemRequest::into_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(NewInvoice {
            company_id: required(self.company_id, "company_id")?,
            client_id: required(self.client_id, "client_id")?,
            date: required(self.date, "date")?,
            due_date: self.due_date,
            payment_terms: required(self.payment_terms, "payment_terms")?,
            status: required(self.status, "status")?,
            balance_due: self.balance_due,
            note: self.note,
            attachments: self.attachments,
            items,
        })
    }
}

/// Invoice with its items and, when loaded, its company and client.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<Client>,
    pub items: Vec<InvoiceItem>,
}

/// Client-facing item: no cost price.
#[derive(Debug, Serialize)]
pub struct DocumentItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Everything a renderer needs to print an invoice.
#[derive(Debug, Serialize)]
pub struct InvoiceDocument {
    pub settings: Settings,
    pub company: Option<Company>,
    pub client: Option<Client>,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub payment_terms: String,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub balance_due: Option<Decimal>,
    pub note: Option<String>,
    pub items: Vec<DocumentItem>,
}

impl InvoiceDocument {
    pub fn new(
        settings: Settings,
        invoice: Invoice,
        company: Option<Company>,
        client: Option<Client>,
        items: Vec<InvoiceItem>,
    ) -> Self {
        Self {
            settings,
            company,
            client,
            invoice_number: invoice.invoice_number,
            date: invoice.date,
            due_date: invoice.due_date,
            payment_terms: invoice.payment_terms,
            status: invoice.status,
            subtotal: invoice.subtotal,
            tax_amount: invoice.tax_amount,
            total: invoice.total,
            balance_due: invoice.balance_due,
            note: invoice.note,
            items: items
                .into_iter()
                .map(|item| DocumentItem {
                    description: item.description,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total,
                })
                .collect(),
        }
    }
}

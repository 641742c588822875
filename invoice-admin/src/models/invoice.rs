//! Invoice model for invoice-admin.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::NewInvoiceItem;

/// Invoice status.
///
/// `Overdue` and `Cancelled` exist in the schema but are never assigned by
/// this service; they can only appear through historical or external writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Unpaid,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(InvoiceStatus::Draft),
            "unpaid" => Some(InvoiceStatus::Unpaid),
            "partially_paid" => Some(InvoiceStatus::PartiallyPaid),
            "paid" => Some(InvoiceStatus::Paid),
            "overdue" => Some(InvoiceStatus::Overdue),
            "cancelled" => Some(InvoiceStatus::Cancelled),
            _ => None,
        }
    }

    /// Statuses an operator may set on create or update.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            InvoiceStatus::Draft
                | InvoiceStatus::Unpaid
                | InvoiceStatus::PartiallyPaid
                | InvoiceStatus::Paid
        )
    }

    /// Unpaid and partially paid invoices still carry a balance.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid)
    }
}

/// How the client settles the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    Cash,
    #[serde(alias = "credit card")]
    CreditCard,
    #[serde(alias = "bank transfer")]
    BankTransfer,
}

impl PaymentTerms {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentTerms::Cash => "cash",
            PaymentTerms::CreditCard => "credit_card",
            PaymentTerms::BankTransfer => "bank_transfer",
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub invoice_number: String,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub payment_terms: String,
    pub status: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    /// Operator-entered remaining amount, independent of `total`.
    pub balance_due: Option<Decimal>,
    pub note: Option<String>,
    pub attachments: Json<Vec<String>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Validated input for creating or replacing an invoice.
///
/// `items` is the complete item set. On update it replaces every stored
/// item; `attachments` are appended to the stored references.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub company_id: Uuid,
    pub client_id: Uuid,
    pub date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub payment_terms: PaymentTerms,
    pub status: InvoiceStatus,
    pub balance_due: Option<Decimal>,
    pub note: Option<String>,
    pub attachments: Vec<String>,
    pub items: Vec<NewInvoiceItem>,
}

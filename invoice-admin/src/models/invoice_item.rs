//! Invoice line item model for invoice-admin.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored line item.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    /// Internal unit cost; never shown to the client.
    pub cost_price: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Raw item as supplied by the operator, before totals are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInvoiceItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub cost_price: Option<Decimal>,
}

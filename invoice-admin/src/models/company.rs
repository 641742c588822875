//! Company model for invoice-admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Company issuing invoices.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub company_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    /// Opaque reference to an already stored logo.
    pub logo_path: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating or replacing a company.
#[derive(Debug, Clone)]
pub struct CompanyInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo_path: Option<String>,
}

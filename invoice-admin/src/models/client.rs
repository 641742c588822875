//! Client model for invoice-admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Client billed by one or more companies.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating or replacing a client.
///
/// `company_ids` is the complete link set; on update it replaces the
/// existing links rather than being merged into them.
#[derive(Debug, Clone)]
pub struct ClientInput {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_ids: Vec<Uuid>,
}

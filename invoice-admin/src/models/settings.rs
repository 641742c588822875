//! Issuer settings printed on invoice documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_SETTINGS_NAME: &str = "My Company";
pub const DEFAULT_SETTINGS_TAGLINE: &str = "COMPANY TAGLINE HERE";

/// Single-row issuer profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Settings {
    pub setting_id: Uuid,
    pub name: String,
    pub logo_path: Option<String>,
    pub logo_tagline: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub privacy_and_policy: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for updating settings. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UpdateSettings {
    pub name: String,
    pub logo_tagline: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub privacy_and_policy: Option<String>,
}

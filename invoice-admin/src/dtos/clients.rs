use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::RequestFields;
use crate::models::{Client, ClientInput, Company};

#[derive(Debug, Deserialize, Validate)]
pub struct ClientRequest {
    #[validate(
        required(message = "Client name is required"),
        length(min = 1, max = 255, message = "Client name must be 1-255 characters")
    )]
    pub name: Option<String>,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,
    /// Complete link set; replaces the stored links on update.
    #[serde(default)]
    #[validate(length(min = 1, message = "At least one company is required"))]
    pub company_ids: Vec<Uuid>,
}

impl RequestFields for ClientRequest {
    const FIELDS: &'static [&'static str] = &["name", "email", "phone", "company_ids"];
}

impl ClientRequest {
    pub fn into_input(self) -> ClientInput {
        let mut company_ids = self.company_ids;
        company_ids.sort();
        company_ids.dedup();

        ClientInput {
            name: self.name.unwrap_or_default(),
            email: self.email,
            phone: self.phone,
            company_ids,
        }
    }
}

/// Client with its linked companies.
#[derive(Debug, Serialize)]
pub struct ClientResponse {
    #[serde(flatten)]
    pub client: Client,
    pub companies: Vec<Company>,
}

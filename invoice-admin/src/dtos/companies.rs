use serde::Deserialize;
use validator::Validate;

use super::RequestFields;
use crate::models::CompanyInput;

#[derive(Debug, Deserialize, Validate)]
pub struct CompanyRequest {
    #[validate(
        required(message = "Company name is required"),
        length(min = 1, max = 255, message = "Company name must be 1-255 characters")
    )]
    pub name: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,
    /// Reference to a logo already stored elsewhere.
    pub logo_path: Option<String>,
}

impl RequestFields for CompanyRequest {
    const FIELDS: &'static [&'static str] = &["name", "address", "phone", "logo_path"];
}

impl CompanyRequest {
    pub fn into_input(self) -> CompanyInput {
        CompanyInput {
            name: self.name.unwrap_or_default(),
            address: self.address,
            phone: self.phone,
            logo_path: self.logo_path,
        }
    }
}

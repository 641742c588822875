use serde::Deserialize;
use validator::Validate;

use super::RequestFields;
use crate::models::UpdateSettings;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(
        required(message = "Name is required"),
        length(min = 1, max = 255, message = "Name must be 1-255 characters")
    )]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Tagline must be at most 255 characters"))]
    pub logo_tagline: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,
    #[validate(
        email(message = "Invalid email address"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: Option<String>,
    pub privacy_and_policy: Option<String>,
}

impl RequestFields for UpdateSettingsRequest {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "logo_tagline",
        "address",
        "phone",
        "email",
        "privacy_and_policy",
    ];
}

impl UpdateSettingsRequest {
    pub fn into_input(self) -> UpdateSettings {
        UpdateSettings {
            name: self.name.unwrap_or_default(),
            logo_tagline: self.logo_tagline,
            address: self.address,
            phone: self.phone,
            email: self.email,
            privacy_and_policy: self.privacy_and_policy,
        }
    }
}

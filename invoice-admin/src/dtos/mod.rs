//! Request and response bodies for the HTTP surface.

use std::borrow::Cow;
use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_path_to_error::Segment;
use service_core::error::AppError;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::services::money::MAX_AMOUNT;

pub mod clients;
pub mod companies;
pub mod invoices;
pub mod settings;

pub use clients::{ClientRequest, ClientResponse};
pub use companies::CompanyRequest;
pub use invoices::{InvoiceDocument, InvoiceItemRequest, InvoiceRequest, InvoiceResponse};
pub use settings::UpdateSettingsRequest;

/// Field names of a request body, used to key type errors the same way
/// `Validate` keys its own.
pub trait RequestFields {
    const FIELDS: &'static [&'static str];
    /// Element fields of list-valued fields holding objects.
    const LIST_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[];
}

/// JSON body that has passed `Validate`.
///
/// Bodies that are not JSON at all are a 400. Values of the wrong type and
/// well-formed bodies failing validation are a 422 with the field map.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + RequestFields + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

        let value: T = serde_path_to_error::deserialize(body).map_err(type_error::<T>)?;
        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

fn static_name(names: &[&'static str], key: &str) -> Option<&'static str> {
    names.iter().copied().find(|name| *name == key)
}

/// Key a deserialization failure by the field it happened in.
fn type_error<T: RequestFields>(err: serde_path_to_error::Error<serde_json::Error>) -> AppError {
    let segments: Vec<&Segment> = err.path().iter().collect();

    let field = match segments.first() {
        Some(Segment::Map { key }) => static_name(T::FIELDS, key),
        _ => None,
    };
    let Some(field) = field else {
        return AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", err));
    };

    let mut error = ValidationError::new("invalid");
    error.message = Some(Cow::Owned(err.inner().to_string()));

    let nested = T::LIST_FIELDS
        .iter()
        .find(|(list, _)| *list == field)
        .and_then(|(_, element_fields)| match segments.get(1..3) {
            Some([Segment::Seq { index }, Segment::Map { key }]) => {
                static_name(element_fields, key).map(|name| (*index, name))
            }
            _ => None,
        });

    let mut errors = ValidationErrors::new();
    match nested {
        Some((index, name)) => {
            let mut element = ValidationErrors::new();
            element.add(name, error);
            errors.0.insert(
                field,
                ValidationErrorsKind::List(BTreeMap::from([(index, Box::new(element))])),
            );
        }
        None => errors.add(field, error),
    }
    AppError::ValidationError(errors)
}

/// Single field error in the same shape the derive produces.
pub fn field_error(field: &'static str, code: &'static str, message: String) -> AppError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Owned(message));

    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::ValidationError(errors)
}

/// Money input: not negative and small enough to store.
pub(crate) fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("range");
        error.message = Some(Cow::Borrowed("Must not be negative"));
        return Err(error);
    }
    validate_storable(value)
}

pub(crate) fn validate_storable(value: &Decimal) -> Result<(), ValidationError> {
    if value.abs() > MAX_AMOUNT {
        let mut error = ValidationError::new("range");
        error.message = Some(Cow::Owned(format!("Must be at most {}", MAX_AMOUNT)));
        return Err(error);
    }
    Ok(())
}

//! Domain models for invoice-admin.

mod client;
mod company;
mod invoice;
mod invoice_item;
mod settings;

pub use client::{Client, ClientInput};
pub use company::{Company, CompanyInput};
pub use invoice::{Invoice, InvoiceStatus, NewInvoice, PaymentTerms};
pub use invoice_item::{InvoiceItem, NewInvoiceItem};
pub use settings::{Settings, UpdateSettings, DEFAULT_SETTINGS_NAME, DEFAULT_SETTINGS_TAGLINE};

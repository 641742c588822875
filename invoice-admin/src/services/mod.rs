//! Services module for invoice-admin.

pub mod analytics;
pub mod database;
pub mod metrics;
pub mod money;
pub mod numbering;
pub mod totals;

pub use analytics::{compute_statistics, AnalyticsSnapshot, DashboardStatistics};
pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use totals::{compute_invoice, ComputedInvoice};

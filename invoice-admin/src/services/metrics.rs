//! Prometheus metrics for invoice-admin.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Histogram, HistogramVec, TextEncoder,
};

/// Invoices created, by initial status.
pub static INVOICES_CREATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_admin_invoices_created_total",
        "Total number of invoices created by status",
        &["status"]
    )
    .expect("Failed to register invoices_created_total")
});

/// Invoices updated, by resulting status.
pub static INVOICES_UPDATED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_admin_invoices_updated_total",
        "Total number of invoice updates by status",
        &["status"]
    )
    .expect("Failed to register invoices_updated_total")
});

/// Invoice number collisions that forced a rescan.
pub static INVOICE_NUMBER_CONFLICTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "invoice_admin_invoice_number_conflicts_total",
        "Invoice number unique violations retried with a fresh scan"
    )
    .expect("Failed to register invoice_number_conflicts_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "invoice_admin_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "invoice_admin_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Dashboard recompute duration, load plus aggregation.
pub static ANALYTICS_DURATION: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "invoice_admin_analytics_duration_seconds",
        "Dashboard statistics computation time in seconds",
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("Failed to register analytics_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&INVOICES_CREATED_TOTAL);
    Lazy::force(&INVOICES_UPDATED_TOTAL);
    Lazy::force(&INVOICE_NUMBER_CONFLICTS_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ANALYTICS_DURATION);
}

/// Count an error by its `AppError::kind` label.
pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exported_text_names_service_metrics() {
        init_metrics();
        INVOICES_CREATED_TOTAL.with_label_values(&["draft"]).inc();

        let text = get_metrics();
        assert!(text.contains("invoice_admin_invoices_created_total"));
    }
}

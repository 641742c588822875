//! Dashboard statistics through the public API.

use chrono::NaiveDate;
use invoice_admin::services::analytics::{
    compute_statistics, AnalyticsInvoice, AnalyticsItem, ClientSnapshot, CompanySnapshot,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(quantity: &str, cost_price: &str, line_total: &str) -> AnalyticsItem {
    AnalyticsItem {
        quantity: Some(quantity.to_string()),
        cost_price: Some(cost_price.to_string()),
        line_total: Some(line_total.to_string()),
    }
}

fn invoice(
    number: &str,
    status: &str,
    on: NaiveDate,
    total: &str,
    balance_due: Option<&str>,
    client_id: Uuid,
) -> AnalyticsInvoice {
    AnalyticsInvoice {
        invoice_number: number.to_string(),
        status: status.to_string(),
        date: Some(on),
        due_date: Some(on),
        total: Some(total.to_string()),
        balance_due: balance_due.map(str::to_string),
        client: ClientSnapshot {
            id: client_id,
            name: Some("Client A".to_string()),
            email: Some("a@example.com".to_string()),
            phone: None,
        },
        company: Some(CompanySnapshot {
            id: Uuid::nil(),
            name: "Alpa".to_string(),
        }),
        items: Vec::new(),
    }
}

#[test]
fn expenses_revenue_and_profit() {
    let mut inv = invoice("#ALPA-2025-01", "paid", date(2025, 1, 5), "120", None, Uuid::new_v4());
    inv.items = vec![item("2", "30", "100.00"), item("1", "5", "20.00")];

    let stats = compute_statistics(1, &[inv], date(2025, 6, 1));

    assert_eq!(stats.financial.expenses.to_string(), "65.00");
    assert_eq!(stats.financial.revenue.to_string(), "120.00");
    assert_eq!(stats.financial.profit.to_string(), "55.00");
}

#[test]
fn outstanding_grouping_for_one_client() {
    let client_a = Uuid::new_v4();
    let invoices = vec![
        invoice("#ALPA-2025-01", "unpaid", date(2025, 1, 1), "100", None, client_a),
        invoice("#ALPA-2025-02", "partially_paid", date(2025, 1, 2), "300", Some("40"), client_a),
    ];

    let stats = compute_statistics(1, &invoices, date(2025, 6, 1));

    assert_eq!(stats.clients_with_outstanding.len(), 1);
    let entry = &stats.clients_with_outstanding[0];
    assert_eq!(entry.client.id, client_a);
    assert_eq!(entry.total_outstanding.to_string(), "140.00");
    assert_eq!(entry.invoice_count, 2);
    assert_eq!(entry.invoices[0].invoice_number, "#ALPA-2025-01");
    assert_eq!(entry.invoices[1].balance_due, dec!(40));
}

#[test]
fn yearly_buckets_sum_to_global_totals() {
    let client = Uuid::new_v4();
    let mut a = invoice("#ALPA-2024-01", "paid", date(2024, 12, 31), "50", None, client);
    a.items = vec![item("1", "10", "50.00")];
    let mut b = invoice("#ALPA-2025-01", "paid", date(2025, 1, 1), "75", None, client);
    b.items = vec![item("3", "4.5", "60.00"), item("1", "0", "15.00")];

    let stats = compute_statistics(1, &[b, a], date(2025, 6, 1));

    let years: Vec<&str> = stats.yearly_financial.iter().map(|y| y.year.as_str()).collect();
    assert_eq!(years, vec!["2024", "2025"]);
    assert_eq!(stats.yearly_financial[0].revenue, dec!(50.00));
    assert_eq!(stats.yearly_financial[1].revenue, dec!(75.00));

    let revenue: rust_decimal::Decimal = stats.yearly_financial.iter().map(|y| y.revenue).sum();
    let expenses: rust_decimal::Decimal = stats.yearly_financial.iter().map(|y| y.expenses).sum();
    let profit: rust_decimal::Decimal = stats.yearly_financial.iter().map(|y| y.profit).sum();
    assert_eq!(revenue, stats.financial.revenue);
    assert_eq!(expenses, stats.financial.expenses);
    assert_eq!(profit, stats.financial.profit);
}

#[test]
fn repeated_computation_is_identical() {
    let client = Uuid::new_v4();
    let mut inv = invoice("#ALPA-2025-03", "unpaid", date(2025, 3, 3), "80", None, client);
    inv.items = vec![item("4", "10", "80.00")];
    let invoices = vec![inv];

    let first = compute_statistics(3, &invoices, date(2025, 6, 1));
    let second = compute_statistics(3, &invoices, date(2025, 6, 1));

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn empty_history_serializes_zeroed_bundle() {
    let stats = compute_statistics(0, &[], date(2025, 6, 1));
    let json = serde_json::to_value(&stats).unwrap();

    assert_eq!(json["total_clients"], 0);
    assert_eq!(json["total_unpaid_invoices"], 0);
    assert_eq!(json["invoice_status"]["total"], 0);
    assert_eq!(json["financial"]["revenue"], "0.00");
    assert_eq!(json["yearly_financial"], serde_json::json!([]));
    assert_eq!(json["clients_with_outstanding"], serde_json::json!([]));
}

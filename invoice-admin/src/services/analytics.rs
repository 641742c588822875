//! Dashboard statistics.
//!
//! A full recomputation over a snapshot of every live invoice and its items.
//! Nothing is cached between calls; the same snapshot always produces the
//! same bundle. Numeric inputs arrive as raw text and are coerced with
//! [`parse_or_zero`] before any arithmetic.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::InvoiceStatus;
use crate::services::money::{parse_or_zero, round_money};

/// Client columns captured alongside an invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientSnapshot {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanySnapshot {
    pub id: Uuid,
    pub name: String,
}

/// Stored item values, untouched.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsItem {
    pub quantity: Option<String>,
    pub cost_price: Option<String>,
    pub line_total: Option<String>,
}

/// One invoice row with its items, as read from the store.
#[derive(Debug, Clone)]
pub struct AnalyticsInvoice {
    pub invoice_number: String,
    pub status: String,
    pub date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub total: Option<String>,
    pub balance_due: Option<String>,
    pub client: ClientSnapshot,
    pub company: Option<CompanySnapshot>,
    pub items: Vec<AnalyticsItem>,
}

/// Everything the dashboard needs, read in one pass.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSnapshot {
    pub total_clients: i64,
    pub invoices: Vec<AnalyticsInvoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCounts {
    pub paid: u64,
    /// `unpaid` and `partially_paid` together.
    pub unpaid: u64,
    pub draft: u64,
    /// Every invoice counted, whatever its status.
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialTotals {
    pub expenses: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyFinancial {
    pub year: String,
    pub expenses: Decimal,
    pub revenue: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutstandingInvoice {
    pub invoice_number: String,
    pub total: Decimal,
    /// Amount still owed on this invoice, not the stored column.
    pub balance_due: Decimal,
    pub due_date: Option<NaiveDate>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientOutstanding {
    pub client: ClientSnapshot,
    pub company: Option<CompanySnapshot>,
    pub total_outstanding: Decimal,
    pub invoice_count: u64,
    pub invoices: Vec<OutstandingInvoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStatistics {
    pub total_clients: i64,
    pub total_unpaid_invoices: u64,
    pub invoice_status: StatusCounts,
    pub financial: FinancialTotals,
    pub yearly_financial: Vec<YearlyFinancial>,
    pub clients_with_outstanding: Vec<ClientOutstanding>,
}

impl FinancialTotals {
    fn add_item(&mut self, item: &AnalyticsItem) {
        let quantity = parse_or_zero(item.quantity.as_deref());
        let cost_price = parse_or_zero(item.cost_price.as_deref());
        let line_total = parse_or_zero(item.line_total.as_deref());
        let cost = quantity * cost_price;

        self.expenses += cost;
        self.revenue += line_total;
        self.profit += line_total - cost;
    }

    fn rounded(&self) -> Self {
        Self {
            expenses: round_money(self.expenses),
            revenue: round_money(self.revenue),
            profit: round_money(self.profit),
        }
    }
}

/// Amount a single outstanding invoice contributes to its client.
///
/// Unpaid invoices owe their total. Partially paid ones owe the
/// operator-entered balance, falling back to the total when none was set.
pub fn outstanding_amount(invoice: &AnalyticsInvoice) -> Decimal {
    match InvoiceStatus::from_string(&invoice.status) {
        Some(InvoiceStatus::Unpaid) => parse_or_zero(invoice.total.as_deref()),
        Some(InvoiceStatus::PartiallyPaid) => match invoice.balance_due.as_deref() {
            Some(balance) => parse_or_zero(Some(balance)),
            None => parse_or_zero(invoice.total.as_deref()),
        },
        _ => Decimal::ZERO,
    }
}

fn status_counts(invoices: &[AnalyticsInvoice]) -> StatusCounts {
    let mut histogram: BTreeMap<&str, u64> = BTreeMap::new();
    for invoice in invoices {
        *histogram.entry(invoice.status.as_str()).or_default() += 1;
    }

    let count = |status: InvoiceStatus| histogram.get(status.as_str()).copied().unwrap_or(0);

    StatusCounts {
        paid: count(InvoiceStatus::Paid),
        unpaid: count(InvoiceStatus::Unpaid) + count(InvoiceStatus::PartiallyPaid),
        draft: count(InvoiceStatus::Draft),
        total: histogram.values().sum(),
    }
}

fn outstanding_by_client(invoices: &[AnalyticsInvoice]) -> Vec<ClientOutstanding> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut clients: Vec<ClientOutstanding> = Vec::new();

    let outstanding = invoices.iter().filter(|invoice| {
        InvoiceStatus::from_string(&invoice.status).is_some_and(|s| s.is_outstanding())
    });

    for invoice in outstanding {
        // The first outstanding invoice seen for a client fixes its
        // client and company snapshot.
        let slot = *index.entry(invoice.client.id).or_insert_with(|| {
            clients.push(ClientOutstanding {
                client: invoice.client.clone(),
                company: invoice.company.clone(),
                total_outstanding: Decimal::ZERO,
                invoice_count: 0,
                invoices: Vec::new(),
            });
            clients.len() - 1
        });

        let amount = outstanding_amount(invoice);
        let entry = &mut clients[slot];
        entry.total_outstanding += amount;
        entry.invoice_count += 1;
        entry.invoices.push(OutstandingInvoice {
            invoice_number: invoice.invoice_number.clone(),
            total: round_money(parse_or_zero(invoice.total.as_deref())),
            balance_due: round_money(amount),
            due_date: invoice.due_date,
            status: invoice.status.clone(),
        });
    }

    for entry in &mut clients {
        entry.total_outstanding = round_money(entry.total_outstanding);
    }
    // Stable, so ties keep first-seen order.
    clients.sort_by(|a, b| b.total_outstanding.cmp(&a.total_outstanding));
    clients
}

/// Build the dashboard bundle from a snapshot of live invoices.
///
/// `today` supplies the year for invoices without a date.
pub fn compute_statistics(
    total_clients: i64,
    invoices: &[AnalyticsInvoice],
    today: NaiveDate,
) -> DashboardStatistics {
    let invoice_status = status_counts(invoices);

    let mut financial = FinancialTotals::default();
    let mut yearly: BTreeMap<i32, FinancialTotals> = BTreeMap::new();

    for invoice in invoices {
        let year = invoice.date.unwrap_or(today).year();
        let bucket = yearly.entry(year).or_default();
        for item in &invoice.items {
            financial.add_item(item);
            bucket.add_item(item);
        }
    }

    let yearly_financial = yearly
        .into_iter()
        .map(|(year, totals)| {
            let totals = totals.rounded();
            YearlyFinancial {
                year: format!("{:04}", year),
                expenses: totals.expenses,
                revenue: totals.revenue,
                profit: totals.profit,
            }
        })
        .collect();

    DashboardStatistics {
        total_clients,
        total_unpaid_invoices: invoice_status.unpaid,
        invoice_status,
        financial: financial.rounded(),
        yearly_financial,
        clients_with_outstanding: outstanding_by_client(invoices),
    }
}

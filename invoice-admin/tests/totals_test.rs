//! Line-item totals through the public API.

use invoice_admin::models::NewInvoiceItem;
use invoice_admin::services::totals::{compute_invoice, TotalsError, TAX_AMOUNT};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn item(quantity: Decimal, unit_price: Decimal, cost_price: Option<Decimal>) -> NewInvoiceItem {
    NewInvoiceItem {
        description: "Service".to_string(),
        quantity,
        unit_price,
        cost_price,
    }
}

#[test]
fn two_item_invoice_totals() {
    let computed = compute_invoice(&[
        item(dec!(2), dec!(50), Some(dec!(30))),
        item(dec!(1), dec!(20), Some(dec!(5))),
    ])
    .unwrap();

    assert_eq!(computed.totals.subtotal.to_string(), "120.00");
    assert_eq!(computed.totals.tax_amount, TAX_AMOUNT);
    assert_eq!(computed.totals.total.to_string(), "120.00");
}

#[test]
fn subtotal_is_rounded_sum_of_products() {
    let items = vec![
        item(dec!(3), dec!(19.99), None),
        item(dec!(0.5), dec!(7.25), None),
        item(dec!(12.75), dec!(1.01), None),
    ];
    let exact: Decimal = items.iter().map(|i| i.quantity * i.unit_price).sum();

    let computed = compute_invoice(&items).unwrap();

    assert_eq!(computed.totals.subtotal, exact.round_dp(2));
    assert_eq!(computed.totals.total, computed.totals.subtotal);
}

#[test]
fn minimum_quantity_at_zero_price() {
    let computed = compute_invoice(&[item(dec!(0.01), dec!(0), None)]).unwrap();

    assert_eq!(computed.items[0].line_total.to_string(), "0.00");
    assert_eq!(computed.totals.subtotal.to_string(), "0.00");
}

#[test]
fn no_items_is_an_error() {
    assert_eq!(compute_invoice(&[]).unwrap_err(), TotalsError::NoItems);
}

//! Line-item and invoice totals.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::NewInvoiceItem;
use crate::services::money::{round_money, MAX_AMOUNT};

/// Tax is a standing zero, not looked up from a rate table.
pub const TAX_AMOUNT: Decimal = Decimal::ZERO;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalsError {
    #[error("an invoice needs at least one item")]
    NoItems,
    #[error("too many items")]
    TooManyItems,
    #[error("item {index} exceeds the largest storable amount")]
    LineOverflow { index: usize },
    #[error("invoice total exceeds the largest storable amount")]
    TotalOverflow,
}

/// Item ready to persist, quantities and prices at storage precision.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedItem {
    pub description: String,
    pub quantity: Decimal,
    pub cost_price: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedInvoice {
    pub items: Vec<ComputedItem>,
    pub totals: InvoiceTotals,
}

/// `quantity * unit_price` at storage precision, or `None` when it does
/// not fit a money column.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(round_money)
        .filter(|total| total.abs() <= MAX_AMOUNT)
}

/// Compute persisted items and header totals from the operator's items.
///
/// Inputs are first brought to storage precision. The subtotal is the sum
/// of the exact products, rounded once at the end, so repeated summation
/// never accumulates rounding drift. It can therefore differ by a cent from
/// the sum of the rounded `line_total`s, which is what revenue rollups add.
pub fn compute_invoice(items: &[NewInvoiceItem]) -> Result<ComputedInvoice, TotalsError> {
    if items.is_empty() {
        return Err(TotalsError::NoItems);
    }

    let mut exact_subtotal = Decimal::ZERO;
    let mut computed = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let quantity = round_money(item.quantity);
        let unit_price = round_money(item.unit_price);
        let cost_price = round_money(item.cost_price.unwrap_or(Decimal::ZERO));

        let line_total =
            line_total(quantity, unit_price).ok_or(TotalsError::LineOverflow { index })?;
        exact_subtotal = quantity
            .checked_mul(unit_price)
            .and_then(|product| exact_subtotal.checked_add(product))
            .ok_or(TotalsError::TotalOverflow)?;

        computed.push(ComputedItem {
            description: item.description.clone(),
            quantity,
            cost_price,
            unit_price,
            line_total,
            sort_order: i32::try_from(index).map_err(|_| TotalsError::TooManyItems)?,
        });
    }

    let subtotal = round_money(exact_subtotal);
    let tax_amount = round_money(TAX_AMOUNT);
    let total = subtotal
        .checked_add(tax_amount)
        .map(round_money)
        .filter(|total| total.abs() <= MAX_AMOUNT)
        .ok_or(TotalsError::TotalOverflow)?;

    Ok(ComputedInvoice {
        items: computed,
        totals: InvoiceTotals {
            subtotal,
            tax_amount,
            total,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, unit_price: Decimal, cost_price: Option<Decimal>) -> NewInvoiceItem {
        NewInvoiceItem {
            description: "Consulting".to_string(),
            quantity,
            unit_price,
            cost_price,
        }
    }

    #[test]
    fn empty_item_list_is_rejected() {
        assert_eq!(compute_invoice(&[]), Err(TotalsError::NoItems));
    }

    #[test]
    fn computes_line_totals_and_subtotal() {
        let computed = compute_invoice(&[
            item(dec!(2), dec!(50), Some(dec!(30))),
            item(dec!(1), dec!(20), Some(dec!(5))),
        ])
        .unwrap();

        assert_eq!(computed.items[0].line_total, dec!(100.00));
        assert_eq!(computed.items[1].line_total, dec!(20.00));
        assert_eq!(computed.totals.subtotal.to_string(), "120.00");
        assert_eq!(computed.totals.tax_amount.to_string(), "0.00");
        assert_eq!(computed.totals.total, computed.totals.subtotal);
    }

    #[test]
    fn keeps_supplied_order() {
        let computed = compute_invoice(&[
            item(dec!(1), dec!(3), None),
            item(dec!(1), dec!(1), None),
            item(dec!(1), dec!(2), None),
        ])
        .unwrap();

        let orders: Vec<i32> = computed.items.iter().map(|i| i.sort_order).collect();
        let prices: Vec<Decimal> = computed.items.iter().map(|i| i.unit_price).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(prices, vec![dec!(3), dec!(1), dec!(2)]);
    }

    #[test]
    fn missing_cost_price_defaults_to_zero() {
        let computed = compute_invoice(&[item(dec!(3), dec!(10), None)]).unwrap();
        assert_eq!(computed.items[0].cost_price.to_string(), "0.00");
    }

    #[test]
    fn smallest_quantity_with_zero_price() {
        let computed = compute_invoice(&[item(dec!(0.01), dec!(0), None)]).unwrap();
        assert_eq!(computed.items[0].line_total.to_string(), "0.00");
        assert_eq!(computed.totals.subtotal.to_string(), "0.00");
    }

    #[test]
    fn subtotal_rounds_once_over_exact_products() {
        // 0.25 * 0.10 = 0.025 three times: each line rounds to 0.03, but the
        // exact sum 0.075 rounds to 0.08.
        let computed = compute_invoice(&[
            item(dec!(0.25), dec!(0.10), None),
            item(dec!(0.25), dec!(0.10), None),
            item(dec!(0.25), dec!(0.10), None),
        ])
        .unwrap();

        assert_eq!(computed.items[0].line_total, dec!(0.03));
        assert_eq!(computed.totals.subtotal, dec!(0.08));
    }

    #[test]
    fn inputs_are_brought_to_storage_precision() {
        let computed = compute_invoice(&[item(dec!(1.333), dec!(9.999), None)]).unwrap();
        assert_eq!(computed.items[0].quantity, dec!(1.33));
        assert_eq!(computed.items[0].unit_price, dec!(10.00));
        assert_eq!(computed.items[0].line_total, dec!(13.30));
    }

    #[test]
    fn product_beyond_decimal_range_is_an_error() {
        let result = compute_invoice(&[
            item(dec!(1), dec!(5), None),
            item(dec!(1000000000000000), dec!(1000000000000000), None),
        ]);
        assert_eq!(result, Err(TotalsError::LineOverflow { index: 1 }));
    }

    #[test]
    fn line_beyond_the_column_is_an_error() {
        assert_eq!(line_total(dec!(2), dec!(9999999999999.99)), None);
        assert_eq!(
            line_total(dec!(1), dec!(9999999999999.99)),
            Some(dec!(9999999999999.99))
        );

        let result = compute_invoice(&[item(dec!(1000000), dec!(100000000), None)]);
        assert_eq!(result, Err(TotalsError::LineOverflow { index: 0 }));
    }

    #[test]
    fn subtotal_beyond_the_column_is_an_error() {
        let result = compute_invoice(&[
            item(dec!(1), dec!(9000000000000), None),
            item(dec!(1), dec!(9000000000000), None),
        ]);
        assert_eq!(result, Err(TotalsError::TotalOverflow));
    }
}

//! Decimal helpers shared by totals and analytics.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fractional digits of every persisted or returned money value.
pub const MONEY_SCALE: u32 = 2;

/// Largest magnitude a `NUMERIC(15,2)` column holds: 9999999999999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(2_764_472_319, 232_830, 0, false, MONEY_SCALE);

/// Round half away from zero to two places and pin the scale, so `120`
/// serializes as `"120.00"`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Parse a stored numeric value, treating anything unusable as zero.
///
/// Historical rows may hold `NULL`, `NaN` or free text in numeric fields.
/// Every arithmetic entry point in the aggregator goes through here so one
/// corrupt row cannot fail the whole rollup.
pub fn parse_or_zero(raw: Option<&str>) -> Decimal {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Decimal::ZERO;
    };

    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_money_pins_two_places() {
        assert_eq!(round_money(dec!(120)).to_string(), "120.00");
        assert_eq!(round_money(dec!(0.005)).to_string(), "0.01");
        assert_eq!(round_money(dec!(2.344)).to_string(), "2.34");
        assert_eq!(round_money(dec!(-1.005)).to_string(), "-1.01");
    }

    #[test]
    fn max_amount_is_the_column_limit() {
        assert_eq!(MAX_AMOUNT, dec!(9999999999999.99));
    }

    #[test]
    fn parse_or_zero_accepts_numbers() {
        assert_eq!(parse_or_zero(Some("12.50")), dec!(12.50));
        assert_eq!(parse_or_zero(Some(" 3 ")), dec!(3));
        assert_eq!(parse_or_zero(Some("1e2")), dec!(100));
    }

    #[test]
    fn parse_or_zero_coerces_garbage() {
        assert_eq!(parse_or_zero(None), Decimal::ZERO);
        assert_eq!(parse_or_zero(Some("")), Decimal::ZERO);
        assert_eq!(parse_or_zero(Some("NaN")), Decimal::ZERO);
        assert_eq!(parse_or_zero(Some("twelve")), Decimal::ZERO);
    }
}

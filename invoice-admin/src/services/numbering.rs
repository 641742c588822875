//! Invoice number generation.
//!
//! Numbers look like `#ALPA-2025-07`: a fixed prefix, the four-digit calendar
//! year and a per-year sequence padded to at least two digits. The next
//! number is derived from the numbers already stored for the year; there is
//! no counter table. Two concurrent creations can derive the same number, so
//! the store's unique constraint is the backstop and the caller reruns the
//! scan on a violation (see `Database::create_invoice`).

/// Literal prefix of every invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "#ALPA";

/// Minimum width of the sequence segment. Wider sequences are never truncated.
pub const SEQUENCE_MIN_WIDTH: usize = 2;

/// Prefix shared by every number issued in `year`, e.g. `#ALPA-2025-`.
pub fn year_prefix(year: i32) -> String {
    format!("{}-{:04}-", INVOICE_NUMBER_PREFIX, year)
}

/// Render a number from its parts.
pub fn format_invoice_number(year: i32, sequence: u64) -> String {
    format!(
        "{}{:0>width$}",
        year_prefix(year),
        sequence,
        width = SEQUENCE_MIN_WIDTH
    )
}

/// Sequence value of a stored number: the third `-` separated segment.
///
/// Anything that is not a plain run of ASCII digits counts as 0.
pub fn parse_sequence(invoice_number: &str) -> u64 {
    invoice_number
        .split('-')
        .nth(2)
        .filter(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|segment| segment.parse().ok())
        .unwrap_or(0)
}

/// Next sequence for `year` given every existing number.
///
/// Numbers from other years or with a foreign prefix are ignored, so the
/// caller may pass an unfiltered snapshot.
pub fn next_sequence<'a, I>(year: i32, existing: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = year_prefix(year);
    existing
        .into_iter()
        .filter(|number| number.starts_with(&prefix))
        .map(parse_sequence)
        .max()
        .unwrap_or(0)
        + 1
}

/// Next invoice number for `year` given every existing number.
pub fn next_invoice_number<'a, I>(year: i32, existing: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    format_invoice_number(year, next_sequence(year, existing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_number_of_the_year_is_one() {
        assert_eq!(next_invoice_number(2025, Vec::<&str>::new()), "#ALPA-2025-01");
    }

    #[test]
    fn continues_from_the_highest_sequence() {
        let existing = ["#ALPA-2025-01", "#ALPA-2025-18", "#ALPA-2025-02"];
        assert_eq!(next_invoice_number(2025, existing), "#ALPA-2025-19");
    }

    #[test]
    fn other_years_do_not_count() {
        let existing = ["#ALPA-2024-57", "#ALPA-2026-03"];
        assert_eq!(next_invoice_number(2025, existing), "#ALPA-2025-01");
    }

    #[test]
    fn padding_is_a_minimum_width() {
        assert_eq!(format_invoice_number(2025, 7), "#ALPA-2025-07");
        assert_eq!(format_invoice_number(2025, 99), "#ALPA-2025-99");
        assert_eq!(format_invoice_number(2025, 100), "#ALPA-2025-100");
        assert_eq!(next_invoice_number(2025, ["#ALPA-2025-99"]), "#ALPA-2025-100");
    }

    #[test]
    fn parses_sequence_segment() {
        assert_eq!(parse_sequence("#ALPA-2025-07"), 7);
        assert_eq!(parse_sequence("#ALPA-2025-123"), 123);
        assert_eq!(parse_sequence("#ALPA-2025-18-copy"), 18);
    }

    #[test]
    fn malformed_sequences_count_as_zero() {
        assert_eq!(parse_sequence("#ALPA-2025-"), 0);
        assert_eq!(parse_sequence("#ALPA-2025-x1"), 0);
        assert_eq!(parse_sequence("#ALPA-2025-1a"), 0);
        assert_eq!(parse_sequence("#ALPA-2025"), 0);

        let existing = ["#ALPA-2025-abc", "#ALPA-2025-04"];
        assert_eq!(next_invoice_number(2025, existing), "#ALPA-2025-05");
    }

    #[test]
    fn year_prefix_does_not_match_longer_years() {
        assert_eq!(next_invoice_number(2025, ["#ALPA-20251-40"]), "#ALPA-2025-01");
    }
}

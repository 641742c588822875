//! Invoice numbering through the public API.

use invoice_admin::services::numbering::{
    format_invoice_number, next_invoice_number, next_sequence, parse_sequence,
};

#[test]
fn next_number_follows_highest_existing() {
    let existing = vec![
        "#ALPA-2025-01".to_string(),
        "#ALPA-2025-02".to_string(),
        "#ALPA-2025-18".to_string(),
    ];

    let next = next_invoice_number(2025, existing.iter().map(String::as_str));

    assert_eq!(next, "#ALPA-2025-19");
}

#[test]
fn formatted_number_parses_back_to_its_sequence() {
    assert_eq!(parse_sequence(&format_invoice_number(2025, 7)), 7);
    assert_eq!(parse_sequence("#ALPA-2025-07"), 7);
}

#[test]
fn sequential_creations_strictly_increase() {
    let mut issued: Vec<String> = Vec::new();

    for _ in 0..120 {
        let next = next_invoice_number(2025, issued.iter().map(String::as_str));
        issued.push(next);
    }

    let sequences: Vec<u64> = issued.iter().map(|n| parse_sequence(n)).collect();
    assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
    assert_eq!(issued[0], "#ALPA-2025-01");
    assert_eq!(issued[98], "#ALPA-2025-99");
    assert_eq!(issued[99], "#ALPA-2025-100");
}

#[test]
fn each_year_restarts_at_one() {
    let existing = ["#ALPA-2024-41", "#ALPA-2024-42"];

    assert_eq!(next_sequence(2024, existing), 43);
    assert_eq!(next_sequence(2025, existing), 1);
}

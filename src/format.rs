//! pt-BR display formatting for currency and dates

use chrono::{FixedOffset, NaiveDate, TimeZone};
use rust_decimal::{Decimal, RoundingStrategy};

const NBSP: char = '\u{a0}';

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56` (with a
/// non-breaking space). Rounds half to even at two decimal places.
pub fn format_brl(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    rounded.set_sign_positive(true);
    rounded.rescale(2);

    let plain = rounded.to_string();
    let (units, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!("{}R${}{},{}", if negative { "-" } else { "" }, NBSP, grouped, cents)
}

/// `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Display date for an epoch-millis timestamp at the given offset
pub fn format_millis(millis: i64, offset: &FixedOffset) -> Option<String> {
    offset
        .timestamp_millis_opt(millis)
        .single()
        .map(|at| format_date(at.date_naive()))
}

//! Number formatting for price rows

use rust_decimal::{Decimal, RoundingStrategy};

/// Separator used between inline fields of a row
pub const SEPARATOR: &str = " · ";

/// Two decimals with thousands separators: `1,234.50`
pub fn display(value: Decimal) -> String {
    let mut rounded = value
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .abs();
    rounded.rescale(2);

    let text = rounded.to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let grouped = group_thousands(int_part);

    if value.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}.{frac_part}")
    } else {
        format!("{grouped}.{frac_part}")
    }
}

/// Like [`display`], with a leading `+` for positive values
pub fn display_sign(value: Decimal) -> String {
    let text = display(value);
    if value.is_sign_positive() && !value.is_zero() && text != "0.00" {
        format!("+{text}")
    } else {
        text
    }
}

/// US dollar amount: `$1,234.50`, `-$3.20`
pub fn currency(value: Decimal) -> String {
    let text = display(value);
    match text.strip_prefix('-') {
        Some(magnitude) => format!("-${magnitude}"),
        None => format!("${text}"),
    }
}

/// Signed percentage: `+0.45%`
pub fn percent(value: Decimal) -> String {
    format!("{}%", display_sign(value))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_and_pads() {
        assert_eq!(display(Decimal::new(1_234_5, 1)), "1,234.50");
        assert_eq!(display(Decimal::new(7, 0)), "7.00");
        assert_eq!(display(Decimal::new(1_234_567_891, 2)), "12,345,678.91");
        assert_eq!(display(Decimal::new(-98_765, 2)), "-987.65");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        assert_eq!(display(Decimal::new(12_345, 4)), "1.23");
        assert_eq!(display(Decimal::new(1_235, 3)), "1.24");
        assert_eq!(display(Decimal::new(-1_235, 3)), "-1.24");
        assert_eq!(display(Decimal::new(-1, 3)), "0.00");
    }

    #[test]
    fn test_display_sign() {
        assert_eq!(display_sign(Decimal::new(123, 2)), "+1.23");
        assert_eq!(display_sign(Decimal::new(-123, 2)), "-1.23");
        assert_eq!(display_sign(Decimal::ZERO), "0.00");
        assert_eq!(display_sign(Decimal::new(1, 3)), "0.00");
    }

    #[test]
    fn test_currency_and_percent() {
        assert_eq!(currency(Decimal::new(18_744, 2)), "$187.44");
        assert_eq!(currency(Decimal::new(-320, 2)), "-$3.20");
        assert_eq!(currency(Decimal::new(1_000_000, 0)), "$1,000,000.00");
        assert_eq!(percent(Decimal::new(45, 2)), "+0.45%");
        assert_eq!(percent(Decimal::new(-64, 2)), "-0.64%");
    }
}

//! Numeric policy for quantities, rates, and hours.
//!
//! Input is permissive: anything that does not parse as a non-negative
//! number becomes zero. Derived values are rounded to two decimal places
//! when they are stored, and division by a (near) zero denominator yields
//! zero.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for stored derived values.
pub const STORED_DECIMAL_PLACES: u32 = 2;

/// Denominators smaller than this in magnitude are treated as zero.
const NEAR_ZERO: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Coerces raw user input to a non-negative number.
///
/// Accepts surrounding whitespace, thousands separators, a leading `$`
/// and scientific notation. Empty, malformed, and negative input yields
/// zero.
#[must_use]
pub fn coerce_input(raw: &str) -> Decimal {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let parsed = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO);

    non_negative(parsed)
}

/// Clamps negative values to zero.
#[must_use]
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Rounds a derived value for storage, half away from zero.
#[must_use]
pub fn round_stored(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(STORED_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Divides, returning zero for near-zero denominators or overflow.
#[must_use]
pub fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.abs() < NEAR_ZERO {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("150", dec!(150))]
    #[case("  12.5 ", dec!(12.5))]
    #[case("1,250.75", dec!(1250.75))]
    #[case("$40", dec!(40))]
    #[case("1e3", dec!(1000))]
    #[case("", dec!(0))]
    #[case("abc", dec!(0))]
    #[case("-5", dec!(0))]
    #[case("12abc", dec!(0))]
    fn test_coerce_input(#[case] raw: &str, #[case] expected: Decimal) {
        assert_eq!(coerce_input(raw), expected);
    }

    #[rstest]
    #[case(dec!(1.005), dec!(1.01))]
    #[case(dec!(1.004), dec!(1.00))]
    #[case(dec!(2.675), dec!(2.68))]
    #[case(dec!(33.333333), dec!(33.33))]
    fn test_round_stored(#[case] value: Decimal, #[case] expected: Decimal) {
        assert_eq!(round_stored(value), expected);
    }

    #[test]
    fn test_safe_div_guards_zero() {
        assert_eq!(safe_div(dec!(50), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(safe_div(dec!(50), dec!(0.0000000001)), Decimal::ZERO);
        assert_eq!(safe_div(dec!(50), dec!(20)), dec!(2.5));
    }
}

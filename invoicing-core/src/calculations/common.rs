//! Shared decimal helpers for the tax calculators.
//!
//! Every monetary value in this crate is a [`Decimal`] carried at two
//! decimal places. Parsing from user-supplied text always goes through
//! [`parse_money`] / [`parse_date`] so that malformed input surfaces as a
//! typed [`TaxCalculationError`] instead of a silent zero.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::TaxCalculationError;

pub const MONTHS_PER_YEAR: Decimal = dec!(12);

const HUNDRED: Decimal = dec!(100);

/// Rounds to exactly two decimal places, midpoints away from zero.
///
/// The result always carries a scale of two, so `dec!(5)` comes back as
/// `5.00` and renders the same way a stored amount does.
///
/// ```
/// use rust_decimal_macros::dec;
/// use invoicing_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.455)).to_string(), "123.46");
/// assert_eq!(round_half_up(dec!(-0.125)).to_string(), "-0.13");
/// assert_eq!(round_half_up(dec!(5)).to_string(), "5.00");
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `part` as a percentage of `whole`, rounded to two decimals.
///
/// Zero when `whole` is not positive.
pub fn percent_of(
    part: Decimal,
    whole: Decimal,
) -> Decimal {
    if whole <= Decimal::ZERO {
        return round_half_up(Decimal::ZERO);
    }
    round_half_up(part / whole * HUNDRED)
}

/// Parses a money amount typed by a user.
///
/// Surrounding whitespace is ignored. The decimal point must be `.`; input
/// containing `,` is rejected rather than guessed at, since `"1000,50"` may
/// mean either a decimal comma or a thousands separator.
///
/// # Errors
///
/// [`TaxCalculationError::InvalidAmount`] naming `field` and echoing `input`.
pub fn parse_money(
    field: &'static str,
    input: &str,
) -> Result<Decimal, TaxCalculationError> {
    let invalid = || TaxCalculationError::InvalidAmount {
        field,
        input: input.to_string(),
    };
    let trimmed = input.trim();
    if trimmed.contains(',') {
        return Err(invalid());
    }
    Decimal::from_str(trimmed).map_err(|_| invalid())
}

/// Parses an ISO `YYYY-MM-DD` date.
///
/// # Errors
///
/// [`TaxCalculationError::InvalidDate`] naming `field` and echoing `input`.
pub fn parse_date(
    field: &'static str,
    input: &str,
) -> Result<NaiveDate, TaxCalculationError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        TaxCalculationError::InvalidDate {
            field,
            input: input.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // =========================================================================
    // round_half_up tests
    // =========================================================================

    #[test]
    fn round_half_up_rounds_down_below_midpoint() {
        assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
    }

    #[test]
    fn round_half_up_rounds_up_at_midpoint() {
        assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
    }

    #[test]
    fn round_half_up_rounds_negative_midpoint_away_from_zero() {
        assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46));
    }

    #[test]
    fn round_half_up_pads_to_two_places() {
        assert_eq!(round_half_up(dec!(869.4)).to_string(), "869.40");
        assert_eq!(round_half_up(dec!(0)).to_string(), "0.00");
    }

    #[test]
    fn round_half_up_is_idempotent() {
        let once = round_half_up(dec!(700.005));

        assert_eq!(round_half_up(once), once);
        assert_eq!(once.to_string(), "700.01");
    }

    #[test]
    fn round_half_up_handles_large_values() {
        assert_eq!(round_half_up(dec!(999999.999)), dec!(1000000.00));
    }

    // =========================================================================
    // percent_of tests
    // =========================================================================

    #[test]
    fn percent_of_rounds_to_two_places() {
        assert_eq!(percent_of(dec!(32.81), dec!(1000.00)), dec!(3.28));
    }

    #[test]
    fn percent_of_zero_whole_is_zero() {
        assert_eq!(percent_of(dec!(10.00), Decimal::ZERO), Decimal::ZERO);
    }

    // =========================================================================
    // parse_money tests
    // =========================================================================

    #[test]
    fn parse_money_trims_whitespace() {
        assert_eq!(parse_money("income", "  1000.50 "), Ok(dec!(1000.50)));
    }

    #[test]
    fn parse_money_rejects_decimal_comma() {
        assert_eq!(
            parse_money("income", "1000,50"),
            Err(TaxCalculationError::InvalidAmount {
                field: "income",
                input: "1000,50".to_string(),
            })
        );
    }

    #[test]
    fn parse_money_rejects_thousands_separator() {
        assert!(parse_money("income", "12,500.00").is_err());
    }

    #[test]
    fn parse_money_keeps_sub_cent_digits() {
        assert_eq!(parse_money("expenses", "100.005"), Ok(dec!(100.005)));
    }

    #[test]
    fn parse_money_rejects_text() {
        assert_eq!(
            parse_money("income", "abc"),
            Err(TaxCalculationError::InvalidAmount {
                field: "income",
                input: "abc".to_string(),
            })
        );
    }

    #[test]
    fn parse_money_rejects_empty_input() {
        assert_eq!(
            parse_money("expenses", "   "),
            Err(TaxCalculationError::InvalidAmount {
                field: "expenses",
                input: "   ".to_string(),
            })
        );
    }

    // =========================================================================
    // parse_date tests
    // =========================================================================

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date("activity_start_date", "2024-03-15"),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        assert_eq!(
            parse_date("activity_start_date", "15/03/2024"),
            Err(TaxCalculationError::InvalidDate {
                field: "activity_start_date",
                input: "15/03/2024".to_string(),
            })
        );
    }
}

//! Sequential invoice numbers.
//!
//! Numbers are the digits of the issuer's most recent invoice number plus
//! one, zero-padded to [`INVOICE_NUMBER_WIDTH`] digits. Anything that cannot
//! be continued restarts the sequence at `00000001`; which fallback applied
//! is reported in [`NumberOrigin`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const INVOICE_NUMBER_WIDTH: usize = 8;

const FIRST_NUMBER: u64 = 1;

/// How the next number was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum NumberOrigin {
    /// Continued from the digits of the previous number.
    Incremented { previous: String },
    /// The issuer has no invoices yet.
    NoPriorInvoice,
    /// The previous number contains no digits at all.
    NoDigits,
    /// The previous number's digits do not fit a 64-bit counter.
    Unparseable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextInvoiceNumber {
    pub number: String,
    pub origin: NumberOrigin,
}

/// Zero-pads `n` to the invoice number width; wider numbers are kept whole.
pub fn format_invoice_number(n: u64) -> String {
    format!("{n:0width$}", width = INVOICE_NUMBER_WIDTH)
}

/// Derives the number following `last`.
///
/// Non-digit characters are discarded before parsing, so prefixes and
/// suffixes never break the sequence.
///
/// ```
/// use invoicing_core::numbering::{next_invoice_number, NumberOrigin};
///
/// let next = next_invoice_number(Some("AA-00000041-X"));
/// assert_eq!(next.number, "00000042");
///
/// let first = next_invoice_number(None);
/// assert_eq!(first.number, "00000001");
/// assert_eq!(first.origin, NumberOrigin::NoPriorInvoice);
/// ```
pub fn next_invoice_number(last: Option<&str>) -> NextInvoiceNumber {
    let Some(last) = last else {
        debug!("No prior invoice; starting numbering at 1");
        return first(NumberOrigin::NoPriorInvoice);
    };

    let digits: String = last.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        warn!(last, "Last invoice number has no digits; restarting at 1");
        return first(NumberOrigin::NoDigits);
    }

    match digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
        Some(next) => NextInvoiceNumber {
            number: format_invoice_number(next),
            origin: NumberOrigin::Incremented {
                previous: last.to_string(),
            },
        },
        None => {
            warn!(last, "Last invoice number does not fit a counter; restarting at 1");
            first(NumberOrigin::Unparseable)
        }
    }
}

fn first(origin: NumberOrigin) -> NextInvoiceNumber {
    NextInvoiceNumber {
        number: format_invoice_number(FIRST_NUMBER),
        origin,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn increments_plain_number() {
        let next = next_invoice_number(Some("00000041"));

        assert_eq!(next.number, "00000042");
    }

    #[test]
    fn strips_prefix_and_suffix() {
        let next = next_invoice_number(Some("AA-00000041-X"));

        assert_eq!(
            next,
            NextInvoiceNumber {
                number: "00000042".to_string(),
                origin: NumberOrigin::Incremented {
                    previous: "AA-00000041-X".to_string(),
                },
            }
        );
    }

    #[test]
    fn concatenates_separated_digit_groups() {
        let next = next_invoice_number(Some("2025/07-3"));

        assert_eq!(next.number, "20250074");
    }

    #[test]
    fn no_prior_invoice_starts_at_one() {
        let next = next_invoice_number(None);

        assert_eq!(next.number, "00000001");
        assert_eq!(next.origin, NumberOrigin::NoPriorInvoice);
    }

    #[test]
    fn no_digits_starts_at_one() {
        let next = next_invoice_number(Some("N/A"));

        assert_eq!(next.number, "00000001");
        assert_eq!(next.origin, NumberOrigin::NoDigits);
    }

    #[test]
    fn empty_number_counts_as_no_digits() {
        let next = next_invoice_number(Some(""));

        assert_eq!(next.origin, NumberOrigin::NoDigits);
    }

    #[test]
    fn overflowing_number_starts_at_one() {
        let next = next_invoice_number(Some("99999999999999999999999"));

        assert_eq!(next.number, "00000001");
        assert_eq!(next.origin, NumberOrigin::Unparseable);
    }

    #[test]
    fn u64_max_cannot_be_incremented() {
        let next = next_invoice_number(Some(&u64::MAX.to_string()));

        assert_eq!(next.origin, NumberOrigin::Unparseable);
    }

    #[test]
    fn grows_past_eight_digits() {
        let next = next_invoice_number(Some("99999999"));

        assert_eq!(next.number, "100000000");
    }

    #[test]
    fn format_pads_to_width() {
        assert_eq!(format_invoice_number(7), "00000007");
    }
}

//! Amounts spelled out in Lithuanian, as printed on invoices.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::calculations::common::round_half_up;

const ZERO: &str = "nulis";

const ONES: [&str; 10] = [
    "", "vienas", "du", "trys", "keturi", "penki", "šeši", "septyni", "aštuoni", "devyni",
];

const TEENS: [&str; 10] = [
    "dešimt",
    "vienuolika",
    "dvylika",
    "trylika",
    "keturiolika",
    "penkiolika",
    "šešiolika",
    "septyniolika",
    "aštuoniolika",
    "devyniolika",
];

const TENS: [&str; 10] = [
    "",
    "",
    "dvidešimt",
    "trisdešimt",
    "keturiasdešimt",
    "penkiasdešimt",
    "šešiasdešimt",
    "septyniasdešimt",
    "aštuoniasdešimt",
    "devyniasdešimt",
];

const HUNDRED: (&str, &str) = ("šimtas", "šimtai");

/// Singular, nominative plural and genitive plural of each power of 1000.
const SCALES: [[&str; 3]; 4] = [
    ["tūkstantis", "tūkstančiai", "tūkstančių"],
    ["milijonas", "milijonai", "milijonų"],
    ["milijardas", "milijardai", "milijardų"],
    ["trilijonas", "trilijonai", "trilijonų"],
];

/// Formats an amount as `"<euros in words> eur ir <cc> ct"`.
///
/// The amount is rounded to cents first. Returns `None` when the euro part
/// is too large to be named.
///
/// ```
/// use rust_decimal_macros::dec;
/// use invoicing_core::words::amount_to_words;
///
/// assert_eq!(
///     amount_to_words(dec!(1250.50)).as_deref(),
///     Some("tūkstantis du šimtai penkiasdešimt eur ir 50 ct")
/// );
/// ```
pub fn amount_to_words(amount: Decimal) -> Option<String> {
    let amount = round_half_up(amount);
    let euros = amount.trunc();
    let cents = ((amount - euros) * dec!(100)).abs().to_u64()?;

    let mut words = integer_to_words(euros.abs().to_u64()?)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        words = format!("minus {words}");
    }
    Some(format!("{words} eur ir {cents:02} ct"))
}

/// Lithuanian cardinal for `n`, or `None` past the trillions.
pub fn integer_to_words(n: u64) -> Option<String> {
    if n == 0 {
        return Some(ZERO.to_string());
    }

    let mut chunks = Vec::new();
    let mut rest = n;
    while rest > 0 {
        chunks.push(rest % 1000);
        rest /= 1000;
    }
    if chunks.len() > SCALES.len() + 1 {
        return None;
    }

    let mut words = Vec::new();
    for (power, &chunk) in chunks.iter().enumerate().rev() {
        if chunk == 0 {
            continue;
        }
        let ones = (chunk % 10) as usize;
        let tens = (chunk / 10 % 10) as usize;
        let hundreds = (chunk / 100) as usize;

        if hundreds > 0 {
            words.push(ONES[hundreds]);
            words.push(if hundreds > 1 { HUNDRED.1 } else { HUNDRED.0 });
        }
        if tens > 1 {
            words.push(TENS[tens]);
        }
        if tens == 1 {
            words.push(TEENS[ones]);
        } else if ones > 0 && !(power > 0 && chunk == 1) {
            words.push(ONES[ones]);
        }
        if power > 0 {
            words.push(pluralize(chunk, &SCALES[power - 1]));
        }
    }
    Some(words.join(" "))
}

fn pluralize<'a>(
    n: u64,
    forms: &[&'a str; 3],
) -> &'a str {
    let ones = n % 10;
    let tens = n / 10 % 10;
    if tens == 1 || ones == 0 {
        forms[2]
    } else if ones == 1 {
        forms[0]
    } else {
        forms[1]
    }
}
